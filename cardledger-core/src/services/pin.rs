//! PIN hashing (Argon2id, PHC string format)

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::PinHashSettings;
use crate::domain::result::{Error, Result};
use crate::ports::SecureRandom;

const SALT_LEN: usize = 16;

/// Hashes and verifies PINs. Salts come from the injected random source.
#[derive(Debug, Clone)]
pub struct PinHasher {
    params: Params,
}

impl PinHasher {
    pub fn new(settings: &PinHashSettings) -> Result<Self> {
        let params = Params::new(
            settings.memory_cost,
            settings.time_cost,
            settings.parallelism,
            None,
        )
        .map_err(|e| Error::Config(format!("Invalid PIN hash parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, pin: &str, random: &dyn SecureRandom) -> Result<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        random.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Config(format!("Failed to encode salt: {}", e)))?;

        let hash = self
            .argon2()
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("Failed to hash PIN: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Cost parameters are read back from the stored hash
    pub fn verify(&self, pin: &str, phc: &str) -> Result<bool> {
        let parsed = PasswordHash::new(phc)
            .map_err(|e| Error::database(format!("Stored PIN hash is malformed: {}", e)))?;
        Ok(Argon2::default().verify_password(pin.as_bytes(), &parsed).is_ok())
    }
}
