//! Wallet credential loading from the environment.
//!
//! Mirrors `BotConfig::load`'s private-key/wallet-address env lookup and
//! hex-format validation, generalized to the three variables this agent
//! needs: `POLY_PRIVATE_KEY`, `POLY_FUNDER`, `POLY_SIG_TYPE`.

use super::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    Eoa,
    PolyProxy,
    PolyGnosisSafe,
}

impl SignatureType {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(SignatureType::Eoa),
            1 => Some(SignatureType::PolyProxy),
            2 => Some(SignatureType::PolyGnosisSafe),
            _ => None,
        }
    }
}

/// Loaded and validated wallet credentials. The private key is never logged.
pub struct PolymarketWallet {
    pub private_key: String,
    pub funder: String,
    pub signature_type: SignatureType,
}

impl PolymarketWallet {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let private_key = std::env::var("POLY_PRIVATE_KEY")
            .map_err(|_| ConfigError::EnvVarMissing("POLY_PRIVATE_KEY".to_string()))?;
        let funder = std::env::var("POLY_FUNDER")
            .map_err(|_| ConfigError::EnvVarMissing("POLY_FUNDER".to_string()))?;
        let sig_type_raw = std::env::var("POLY_SIG_TYPE").unwrap_or_else(|_| "0".to_string());

        if !private_key.starts_with("0x") || private_key.len() != 66 {
            return Err(ConfigError::ValidationError(
                "POLY_PRIVATE_KEY must be 0x followed by 64 hex characters".to_string(),
            ));
        }
        if !funder.starts_with("0x") || funder.len() != 42 {
            return Err(ConfigError::ValidationError(
                "POLY_FUNDER must be 0x followed by 40 hex characters".to_string(),
            ));
        }
        let sig_value: u8 = sig_type_raw
            .parse()
            .map_err(|_| ConfigError::ValidationError("POLY_SIG_TYPE must be 0, 1, or 2".to_string()))?;
        let signature_type = SignatureType::from_u8(sig_value)
            .ok_or_else(|| ConfigError::ValidationError("POLY_SIG_TYPE must be 0, 1, or 2".to_string()))?;

        Ok(Self { private_key, funder, signature_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_private_key() {
        std::env::set_var("POLY_PRIVATE_KEY", "0xabc");
        std::env::set_var("POLY_FUNDER", "0x1234567890123456789012345678901234567890");
        std::env::set_var("POLY_SIG_TYPE", "0");
        assert!(PolymarketWallet::from_env().is_err());
        std::env::remove_var("POLY_PRIVATE_KEY");
        std::env::remove_var("POLY_FUNDER");
        std::env::remove_var("POLY_SIG_TYPE");
    }

    #[test]
    fn rejects_bad_signature_type() {
        std::env::set_var(
            "POLY_PRIVATE_KEY",
            "0x1234567890123456789012345678901234567890123456789012345678901234",
        );
        std::env::set_var("POLY_FUNDER", "0x1234567890123456789012345678901234567890");
        std::env::set_var("POLY_SIG_TYPE", "9");
        assert!(PolymarketWallet::from_env().is_err());
        std::env::remove_var("POLY_PRIVATE_KEY");
        std::env::remove_var("POLY_FUNDER");
        std::env::remove_var("POLY_SIG_TYPE");
    }
}
