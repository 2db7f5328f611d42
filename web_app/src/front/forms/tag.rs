use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct LookupQuery {
    #[serde(default)]
    pub code: Option<String>,
}

/// Admin form to create tags. A blank code asks for a generated one.
#[derive(Debug, Deserialize, Default)]
pub struct CreateTagForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub has_nfc: Option<String>,
}

impl CreateTagForm {
    pub fn wants_nfc(&self) -> bool {
        self.has_nfc.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkNfcForm {
    #[serde(default)]
    pub has_nfc: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VerifyUserQuery {
    #[serde(default)]
    pub email: Option<String>,
}
