use crate::common::{Value, GENERATED_KEY_LENGTH};
use crate::errors::{CofferError, CofferResult, ErrorKind};
use crate::schema::PropertyType;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generates a random key for a property of the given type.
///
/// Strings get [GENERATED_KEY_LENGTH] alphanumeric characters. Numbers are
/// drawn uniformly from `1..=max`.
pub(crate) fn generate_key(property_type: PropertyType, max: i64) -> CofferResult<Value> {
    match property_type {
        PropertyType::String => {
            let key: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(GENERATED_KEY_LENGTH)
                .map(char::from)
                .collect();
            Ok(Value::String(key))
        }
        PropertyType::Integer | PropertyType::Number => {
            if max < 1 {
                log::error!("Cannot generate a numeric key below {}", max);
                return Err(CofferError::new(
                    "max key value must be positive",
                    ErrorKind::InvalidArgument,
                ));
            }
            Ok(Value::I64(rand::thread_rng().gen_range(1..=max)))
        }
        other => {
            log::error!("Cannot generate a key of type {}", other.name());
            Err(CofferError::new(
                &format!("unsupported type {}", other.name()),
                ErrorKind::UnsupportedKeyType,
            ))
        }
    }
}
