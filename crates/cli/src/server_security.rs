use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;

/// Resolves `bind` (hostnames included) to the address the intake server listens on.
///
/// Fails when any resolved address is non-loopback and `public` is not set. IPv4 wins when
/// the name resolves to both families.
pub(crate) async fn guarded_bind_addr(bind: &str, public: bool) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();
    pick_bind_addr(bind, &addrs, public)
}

fn pick_bind_addr(bind: &str, addrs: &[SocketAddr], public: bool) -> Result<SocketAddr> {
    if !public {
        if let Some(exposed) = addrs.iter().find(|addr| !addr.ip().is_loopback()) {
            anyhow::bail!(
                "Refusing to bind to non-loopback address without --public: {bind} ({exposed}). The intake server has no authentication; pass --public only behind a trusted proxy."
            )
        }
    }
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .with_context(|| format!("Bind address resolved to nothing: {bind}"))
}
