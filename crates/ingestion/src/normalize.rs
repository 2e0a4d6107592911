//! 原始定位数据规范化
//!
//! 将平台回调的 `RawFix` 转换为 `PositionSample`，在进入引擎前剔除结构性错误
//! (非有限值、越界坐标、负精度)。统计意义上的过滤 (精度、跳点、乱序) 属于引擎。

use contracts::{PositionSample, RawFix};

use crate::error::{IngestionError, Result};

/// 规范化单个原始定位
///
/// 可选字段中不合理的值 (负速度、越界航向、非有限高度) 置为 `None`，
/// 必填字段不合理时返回错误。
pub fn normalize_fix(raw: &RawFix) -> Result<PositionSample> {
    let latitude = finite("latitude", raw.latitude)?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(IngestionError::invalid_fix(
            "latitude",
            format!("{latitude} outside [-90, 90]"),
        ));
    }

    let longitude = finite("longitude", raw.longitude)?;
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(IngestionError::invalid_fix(
            "longitude",
            format!("{longitude} outside [-180, 180]"),
        ));
    }

    let accuracy = finite("accuracy", raw.accuracy)?;
    if accuracy < 0.0 {
        return Err(IngestionError::invalid_fix(
            "accuracy",
            format!("{accuracy} is negative"),
        ));
    }

    let captured_at = finite("timestamp", raw.timestamp)?;

    Ok(PositionSample {
        latitude,
        longitude,
        altitude: raw.altitude.filter(|a| a.is_finite()),
        accuracy,
        speed: raw.speed.filter(|s| s.is_finite() && *s >= 0.0),
        heading: raw
            .heading
            .filter(|h| h.is_finite() && (0.0..360.0).contains(h)),
        captured_at,
    })
}

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(IngestionError::invalid_fix(field, format!("{value} is not finite")))
    }
}
