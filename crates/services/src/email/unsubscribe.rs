use domains::errors::{DomainError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies the `{user_id}.{mac}` tokens carried by unsubscribe links.
#[derive(Clone)]
pub struct UnsubscribeSigner {
    key: Vec<u8>,
}

impl UnsubscribeSigner {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    fn mac(&self, user_part: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| DomainError::Internal(format!("unsubscribe key: {e}")))?;
        mac.update(b"unsubscribe:");
        mac.update(user_part.as_bytes());
        Ok(mac)
    }

    pub fn sign(&self, user_id: Uuid) -> Result<String> {
        let user_part = user_id.simple().to_string();
        let sig = self.mac(&user_part)?.finalize().into_bytes();
        Ok(format!("{user_part}.{}", hex::encode(sig)))
    }

    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let invalid = || DomainError::validation("invalid unsubscribe token");
        let (user_part, sig_part) = token.split_once('.').ok_or_else(invalid)?;
        let user_id = Uuid::try_parse(user_part).map_err(|_| invalid())?;
        let sig = hex::decode(sig_part).map_err(|_| invalid())?;
        self.mac(user_part)?.verify_slice(&sig).map_err(|_| invalid())?;
        Ok(user_id)
    }
}
