use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub provider_url: String,
    pub provider_token: SecretString,
    pub hash_cost: u32,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(provider_url: String) -> Self {
        Self {
            provider_url,
            provider_token: SecretString::default(),
            hash_cost: 12,
        }
    }

    pub fn set_token(&mut self, token: SecretString) {
        self.provider_token = token;
    }
}
