//! Deterministic construction of request messages from input items.

use crate::{BuildError, DataItem, FieldValue};
use flowline::{CodecMode, DataPart, RequestMessage, codec};

/// Builds [`RequestMessage`]s from batches of input items.
///
/// Construction is deterministic: the same items, endpoint, and codec mode
/// always yield a byte-for-byte identical message. Array fields are routed
/// through the quantizing codec; scalar fields are copied verbatim in input
/// order.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoint: String,
    mode: CodecMode,
}

impl RequestBuilder {
    pub fn new(endpoint: impl Into<String>, mode: CodecMode) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode,
        }
    }

    /// Builds one request message from a batch of items.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if any item carries no fields or repeats a
    /// field name.
    pub fn build(&self, items: &[DataItem]) -> Result<RequestMessage, BuildError> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            parts.push(self.build_part(item)?);
        }
        Ok(RequestMessage {
            endpoint: self.endpoint.clone(),
            parts,
        })
    }

    fn build_part(&self, item: &DataItem) -> Result<DataPart, BuildError> {
        if item.fields.is_empty() {
            return Err(BuildError::EmptyItem);
        }
        let mut part = DataPart {
            id: item.id.clone(),
            arrays: Vec::new(),
            scalars: Vec::new(),
        };
        for (index, (name, value)) in item.fields.iter().enumerate() {
            if item.fields[..index].iter().any(|(seen, _)| seen == name) {
                return Err(BuildError::DuplicateField { name: name.clone() });
            }
            match value {
                FieldValue::Array(array) => {
                    part.arrays
                        .push((name.clone(), codec::encode(array, self.mode)));
                }
                FieldValue::Scalar(scalar) => {
                    part.scalars.push((name.clone(), scalar.clone()));
                }
            }
        }
        Ok(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline::{NdArray, Quantization, ScalarValue};

    fn item_with_array() -> DataItem {
        DataItem::new()
            .with_id("doc-1")
            .with_array(
                "embedding",
                NdArray::from_f32(vec![0.5, -1.0, 2.0, 0.0], vec![4]).unwrap(),
            )
            .with_scalar("label", ScalarValue::Text("cat".to_owned()))
    }

    #[test]
    fn build_is_deterministic() {
        let builder = RequestBuilder::new("/index", CodecMode::Fp16);
        let items = [item_with_array(), item_with_array()];

        let a = builder.build(&items).unwrap();
        let b = builder.build(&items).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.endpoint, "/index");
        assert_eq!(a.parts.len(), 2);
    }

    #[test]
    fn arrays_are_encoded_and_scalars_copied() {
        let builder = RequestBuilder::new("/", CodecMode::Fp16);
        let message = builder.build(&[item_with_array()]).unwrap();

        let part = &message.parts[0];
        assert_eq!(part.id.as_deref(), Some("doc-1"));
        assert_eq!(part.arrays.len(), 1);
        assert_eq!(part.arrays[0].1.quantization, Quantization::Fp16);
        assert_eq!(
            part.scalars,
            vec![("label".to_owned(), ScalarValue::Text("cat".to_owned()))]
        );
    }

    #[test]
    fn empty_item_is_rejected() {
        let builder = RequestBuilder::new("/", CodecMode::None);
        assert_eq!(
            builder.build(&[DataItem::new()]),
            Err(BuildError::EmptyItem)
        );
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let builder = RequestBuilder::new("/", CodecMode::None);
        let item = DataItem::new()
            .with_scalar("x", ScalarValue::Int(1))
            .with_scalar("x", ScalarValue::Int(2));
        assert_eq!(
            builder.build(&[item]),
            Err(BuildError::DuplicateField { name: "x".into() })
        );
    }
}
