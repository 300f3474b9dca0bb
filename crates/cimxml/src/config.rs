use serde::Deserialize;

/// Decoder options fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Type value-less `EmbeddedObject="object"` slots as class rather than
    /// string.
    pub strict_embedded_typing: bool,
    /// Also collect `PARAMVALUE` elements nested inside `RETURNVALUE`.
    pub return_value_params: bool,
    /// Decode intrinsic `CLASS`, `INSTANCE` and `QUALIFIER.DECLARATION`
    /// parameters as references to the decoded object.
    pub object_params_as_references: bool,
}

impl DecoderConfig {
    pub fn strict() -> Self {
        Self {
            strict_embedded_typing: true,
            ..Self::default()
        }
    }
}
