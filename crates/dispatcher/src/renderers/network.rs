//! NetworkRenderer - UDP fire-and-forget streaming to a remote map
//!
//! Each call becomes one or more datagrams. Route points are sent
//! incrementally: only points the receiver has not seen yet, split into
//! chunks so no datagram exceeds the configured size.

use contracts::{ContractError, GeoBounds, GeoPoint, MapRenderer, PathView};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for NetworkRenderer
#[derive(Debug, Clone)]
pub struct NetworkRendererConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: NetworkFormat,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
    /// Route points per datagram
    pub points_per_packet: usize,
}

impl NetworkRendererConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        let points_per_packet = params
            .get("points_per_packet")
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(512);

        Ok(Self {
            addr,
            format,
            max_packet_size,
            points_per_packet,
        })
    }
}

/// Wire message
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum RenderMessage<'a> {
    /// Route points starting at `offset`; offset 0 means "new route"
    Route { offset: usize, points: &'a [GeoPoint] },
    Position(&'a GeoPoint),
    Bounds(&'a GeoBounds),
}

/// Renderer that streams updates over UDP
pub struct NetworkRenderer {
    name: String,
    config: NetworkRendererConfig,
    socket: Option<UdpSocket>,
    /// Route points already sent
    sent_points: usize,
}

impl NetworkRenderer {
    #[instrument(name = "network_renderer_new", skip(name, config))]
    pub async fn new(
        name: impl Into<String>,
        config: NetworkRendererConfig,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(
            renderer = %name,
            target = %config.addr,
            "NetworkRenderer connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
            sent_points: 0,
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_renderer_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkRendererConfig::from_params(params)
            .map_err(|e| ContractError::renderer(&name, e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::renderer(&name, e.to_string()))
    }

    fn encode(&self, message: &RenderMessage<'_>) -> Result<Vec<u8>, ContractError> {
        let data = match self.config.format {
            NetworkFormat::Json => serde_json::to_vec(message)
                .map_err(|e| ContractError::renderer(&self.name, format!("json error: {e}")))?,
            NetworkFormat::Bincode => bincode::serialize(message)
                .map_err(|e| ContractError::renderer(&self.name, format!("bincode error: {e}")))?,
        };

        if data.len() > self.config.max_packet_size {
            warn!(
                renderer = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Datagram exceeds configured size"
            );
        }
        Ok(data)
    }

    async fn transmit(&self, message: RenderMessage<'_>) -> Result<(), ContractError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::renderer(&self.name, "socket not connected"))?;
        let data = self.encode(&message)?;

        match socket.send(&data).await {
            Ok(sent) => {
                debug!(renderer = %self.name, bytes = sent, "Sent");
            }
            Err(e) => {
                // UDP is best-effort
                error!(renderer = %self.name, error = %e, "UDP send failed");
            }
        }
        Ok(())
    }
}

impl MapRenderer for NetworkRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_renderer_draw_path",
        skip(self, path),
        fields(renderer = %self.name, points = path.len())
    )]
    async fn draw_path(&mut self, path: &PathView) -> Result<(), ContractError> {
        // a shorter path means a new session: resend from the start
        if path.len() < self.sent_points {
            self.sent_points = 0;
        }

        let fresh: Vec<GeoPoint> = path.points().skip(self.sent_points).collect();
        let mut offset = self.sent_points;
        for chunk in fresh.chunks(self.config.points_per_packet) {
            self.transmit(RenderMessage::Route {
                offset,
                points: chunk,
            })
            .await?;
            offset += chunk.len();
        }
        self.sent_points = offset;
        Ok(())
    }

    async fn update_current_position(&mut self, position: &GeoPoint) -> Result<(), ContractError> {
        self.transmit(RenderMessage::Position(position)).await
    }

    async fn set_view_bounds(&mut self, bounds: &GeoBounds) -> Result<(), ContractError> {
        self.transmit(RenderMessage::Bounds(bounds)).await
    }

    #[instrument(name = "network_renderer_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(renderer = %self.name, "NetworkRenderer closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::track_update;

    async fn receiver() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn config(addr: SocketAddr, format: NetworkFormat) -> NetworkRendererConfig {
        NetworkRendererConfig {
            addr,
            format,
            max_packet_size: 65000,
            points_per_packet: 2,
        }
    }

    #[test]
    fn test_network_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "bincode".to_string());

        let config = NetworkRendererConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, NetworkFormat::Bincode);
        assert_eq!(config.points_per_packet, 512);

        params.insert("format".to_string(), "xml".to_string());
        assert!(NetworkRendererConfig::from_params(&params).is_err());
    }

    #[tokio::test]
    async fn test_route_sent_incrementally_in_chunks() {
        let (rx, addr) = receiver().await;
        let mut renderer = NetworkRenderer::new("net", config(addr, NetworkFormat::Json))
            .await
            .unwrap();

        renderer.draw_path(&track_update("act-1", 3).path).await.unwrap();
        renderer.draw_path(&track_update("act-1", 4).path).await.unwrap();

        let mut buf = vec![0u8; 65536];
        let mut offsets = Vec::new();
        for _ in 0..3 {
            let n = rx.recv(&mut buf).await.unwrap();
            let value: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
            offsets.push(value["route"]["offset"].as_u64().unwrap());
        }
        // 3 points in chunks of 2, then the single new point
        assert_eq!(offsets, vec![0, 2, 3]);
        assert_eq!(renderer.sent_points, 4);
    }

    #[tokio::test]
    async fn test_bincode_position() {
        let (rx, addr) = receiver().await;
        let mut renderer = NetworkRenderer::new("net", config(addr, NetworkFormat::Bincode))
            .await
            .unwrap();

        let position = GeoPoint { lat: 1.5, lng: 2.5 };
        renderer.update_current_position(&position).await.unwrap();

        let mut buf = vec![0u8; 1024];
        let n = rx.recv(&mut buf).await.unwrap();
        // u32 variant index + two f64
        assert_eq!(n, 4 + 16);
    }

    #[tokio::test]
    async fn test_closed_renderer_errors() {
        let (_rx, addr) = receiver().await;
        let mut renderer = NetworkRenderer::new("net", config(addr, NetworkFormat::Json))
            .await
            .unwrap();
        renderer.close().await.unwrap();
        assert!(renderer
            .set_view_bounds(&GeoBounds::around(GeoPoint { lat: 0.0, lng: 0.0 }))
            .await
            .is_err());
    }
}
