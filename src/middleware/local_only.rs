//! Restricción de acceso local
//!
//! Las rutas de administración y de Google solo aceptan peticiones desde
//! loopback salvo que `SAHOCARS_ADMIN_ALLOW_REMOTE=true`.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::state::AppState;
use crate::utils::errors::AppError;

/// Middleware: 403 "Acceso solo local" para clientes remotos
pub async fn require_local(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.config.admin_allow_remote {
        return Ok(next.run(request).await);
    }
    match connect_info {
        Some(ConnectInfo(addr)) if is_local(addr.ip()) => Ok(next.run(request).await),
        other => {
            warn!(
                "Acceso remoto rechazado a {} desde {:?}",
                request.uri().path(),
                other.map(|ConnectInfo(addr)| addr)
            );
            Err(AppError::Forbidden("Acceso solo local".to_string()))
        }
    }
}

/// Loopback, incluida la forma IPv6 mapeada `::ffff:127.0.0.1`
pub fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or(v6.is_loopback(), |v4| v4.is_loopback()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local() {
        assert!(is_local("127.0.0.1".parse().unwrap()));
        assert!(is_local("::1".parse().unwrap()));
        assert!(is_local("::ffff:127.0.0.1".parse().unwrap()));
        assert!(!is_local("192.168.1.20".parse().unwrap()));
        assert!(!is_local("::ffff:10.0.0.5".parse().unwrap()));
    }
}
