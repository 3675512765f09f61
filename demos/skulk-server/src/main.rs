//! Dedicated Skulk lobby server.
//!
//! Signs players in as guests and listens on `SKULK_BIND`
//! (default `0.0.0.0:8080`). Log verbosity follows `RUST_LOG`.

use skulk::prelude::*;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

fn bind_addr(env: Option<String>) -> String {
    env.filter(|addr| !addr.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BIND.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    skulk::init_tracing();

    let addr = bind_addr(std::env::var("SKULK_BIND").ok());
    let server = SkulkServer::builder()
        .bind(&addr)
        .lobby_config(LobbyConfig::default())
        .build(GuestAuthenticator::default())
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_defaults_when_unset_or_blank() {
        assert_eq!(bind_addr(None), DEFAULT_BIND);
        assert_eq!(bind_addr(Some("  ".into())), DEFAULT_BIND);
    }

    #[test]
    fn test_bind_addr_uses_env_value() {
        assert_eq!(bind_addr(Some("127.0.0.1:9000".into())), "127.0.0.1:9000");
    }
}
