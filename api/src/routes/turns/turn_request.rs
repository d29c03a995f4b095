use base64::{Engine as _, engine::general_purpose::STANDARD};
use contextor::{ImageInput, InputError, TurnInput};
use serde::Deserialize;

use crate::error_handler::{AppError, AppResult};

const DEFAULT_IMAGE_NAME: &str = "upload";

/// Request payload for `POST /sessions/{id}/turns`.
#[derive(Debug, Default, Deserialize)]
pub struct TurnRequest {
    /// User utterance.
    #[serde(default)]
    pub text: Option<String>,
    /// Image bytes, plain base64 or a `data:` URI.
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Display name for the image (e.g. the uploaded file name).
    #[serde(default)]
    pub image_name: Option<String>,
    /// Optional override of the number of results.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl TurnRequest {
    /// Validates the payload into a pipeline input.
    pub fn into_input(self, max_top_k: usize) -> AppResult<TurnInput> {
        if let Some(k) = self.top_k.filter(|k| !(1..=max_top_k).contains(k)) {
            return Err(InputError::TopKOutOfRange {
                got: k,
                max: max_top_k,
            }
            .into());
        }

        let image = match self.image_base64.as_deref().map(str::trim) {
            Some(b64) if !b64.is_empty() => Some(ImageInput {
                bytes: decode_image(b64)?,
                reference: self
                    .image_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string()),
            }),
            _ => None,
        };

        Ok(TurnInput::new(self.text, image, self.top_k)?)
    }
}

fn decode_image(raw: &str) -> AppResult<Vec<u8>> {
    // data:image/png;base64,....
    let payload = match raw.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| AppError::InvalidField {
                field: "image_base64",
                message: "data URI is not base64-encoded".into(),
            })?,
        None => raw,
    };
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AppError::InvalidField {
            field: "image_base64",
            message: format!("not valid base64: {e}"),
        })?;
    if bytes.is_empty() {
        return Err(AppError::InvalidField {
            field: "image_base64",
            message: "image is empty".into(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(text: Option<&str>, image: Option<&str>, top_k: Option<usize>) -> TurnRequest {
        TurnRequest {
            text: text.map(str::to_string),
            image_base64: image.map(str::to_string),
            image_name: None,
            top_k,
        }
    }

    #[test]
    fn text_only_is_accepted() {
        let input = req(Some("busco cables"), None, Some(5)).into_input(10).unwrap();
        assert_eq!(input.raw_text(), Some("busco cables"));
        assert_eq!(input.top_k(), Some(5));
        assert!(input.image().is_none());
    }

    #[test]
    fn data_uri_and_plain_base64_decode_the_same() {
        let a = req(None, Some("iVBORw0K"), None).into_input(10).unwrap();
        let b = req(None, Some("data:image/png;base64,iVBO\nRw0K"), None)
            .into_input(10)
            .unwrap();
        assert_eq!(a.image().unwrap().bytes, b.image().unwrap().bytes);
        assert_eq!(a.image().unwrap().bytes[..4], [0x89, b'P', b'N', b'G']);
        assert_eq!(a.image().unwrap().reference, "upload");
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            req(None, None, None).into_input(10),
            Err(AppError::Input(InputError::Empty))
        ));
        assert!(matches!(
            req(Some("  "), Some(""), None).into_input(10),
            Err(AppError::Input(InputError::Empty))
        ));
        assert!(matches!(
            req(None, Some("@@not base64@@"), None).into_input(10),
            Err(AppError::InvalidField { field: "image_base64", .. })
        ));
        assert!(matches!(
            req(Some("x"), None, Some(0)).into_input(10),
            Err(AppError::Input(InputError::TopKOutOfRange { got: 0, max: 10 }))
        ));
        assert!(matches!(
            req(Some("x"), None, Some(11)).into_input(10),
            Err(AppError::Input(InputError::TopKOutOfRange { got: 11, .. }))
        ));
    }
}
