//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (`validator` derive)
//! - renderer 名称非空且唯一
//! - renderer / store 必填参数齐全
//! - 信号阈值 fair <= poor

use std::collections::HashSet;

use contracts::{ContractError, RendererType, StoreType, TrackerBlueprint};
use validator::Validate;

/// 校验 TrackerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_renderers(blueprint)?;
    validate_signal_bands(blueprint)?;
    validate_store(blueprint)?;
    Ok(())
}

/// 字段范围校验
fn validate_ranges(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        ContractError::config_validation("blueprint", errors.to_string().replace('\n', "; "))
    })
}

/// 校验 renderer 配置
fn validate_renderers(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, renderer) in blueprint.renderers.iter().enumerate() {
        if renderer.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("renderers[{}].name", idx),
                "renderer name cannot be empty",
            ));
        }
        if !seen.insert(renderer.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("renderers[name={}]", renderer.name),
                "duplicate renderer name",
            ));
        }

        let required = match renderer.renderer_type {
            RendererType::Log => None,
            RendererType::GeoJson => Some("path"),
            RendererType::Network => Some("addr"),
        };
        if let Some(key) = required {
            if !renderer.params.contains_key(key) {
                return Err(ContractError::config_validation(
                    format!("renderers[{}].params.{}", renderer.name, key),
                    format!("'{key}' is required for {:?} renderers", renderer.renderer_type),
                ));
            }
        }
    }
    Ok(())
}

/// 校验信号质量阈值顺序
fn validate_signal_bands(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let signal = &blueprint.signal;

    if signal.fair_rejection_ratio > signal.poor_rejection_ratio {
        return Err(ContractError::config_validation(
            "signal.fair_rejection_ratio / signal.poor_rejection_ratio",
            format!(
                "fair_rejection_ratio ({}) must be <= poor_rejection_ratio ({})",
                signal.fair_rejection_ratio, signal.poor_rejection_ratio
            ),
        ));
    }

    if signal.fair_accuracy_fraction > signal.poor_accuracy_fraction {
        return Err(ContractError::config_validation(
            "signal.fair_accuracy_fraction / signal.poor_accuracy_fraction",
            format!(
                "fair_accuracy_fraction ({}) must be <= poor_accuracy_fraction ({})",
                signal.fair_accuracy_fraction, signal.poor_accuracy_fraction
            ),
        ));
    }

    Ok(())
}

/// 校验 store 配置
fn validate_store(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    if let Some(store) = &blueprint.store {
        if store.store_type == StoreType::JsonFile && !store.params.contains_key("dir") {
            return Err(ContractError::config_validation(
                "store.params.dir",
                "'dir' is required for json_file store",
            ));
        }
    }
    Ok(())
}
