//! LAN address discovery and the terminal QR code shown at startup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use qrcode::render::unicode::Dense1x2;
use qrcode::types::QrError;
use qrcode::QrCode;
use tracing::debug;

/// Address reported when the LAN address cannot be detected
pub const FALLBACK_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Best-effort address of this host on the local network.
///
/// Connecting a UDP socket sends no packets; it only makes the OS pick the
/// outbound interface. Any failure yields [`FALLBACK_IP`].
pub fn local_ip() -> IpAddr {
    match detect_local_ip() {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(ip) => {
            debug!("Detected unspecified local address {}, using fallback", ip);
            FALLBACK_IP
        }
        Err(e) => {
            debug!("Local IP detection failed: {}", e);
            FALLBACK_IP
        }
    }
}

fn detect_local_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
    Ok(socket.local_addr()?.ip())
}

/// URL a device on the same network can open.
pub fn lan_url(ip: IpAddr, port: u16) -> String {
    format!("http://{}/", SocketAddr::new(ip, port))
}

/// Render `data` as a QR code using Unicode half blocks.
///
/// Colors are inverted so the code scans on dark terminal backgrounds.
pub fn render_qr(data: &str) -> Result<String, QrError> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}
