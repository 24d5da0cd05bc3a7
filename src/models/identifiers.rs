use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! impl_id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl PartialEq<i64> for $name {
            fn eq(&self, other: &i64) -> bool {
                self.0 == *other
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

// Handle of a player instance created by the native layer.
impl_id_type!(PlayerId);
// Registration handle returned by `PlayerController::add_listener`.
impl_id_type!(ListenerId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_compares_with_raw_value() {
        let id = PlayerId::new(1);
        assert_eq!(id, 1);
        assert_eq!(id.value(), 1);
        assert_eq!(id.to_string(), "1");
    }

    #[test]
    fn test_player_id_from_str() {
        assert_eq!(" 42 ".parse::<PlayerId>().unwrap(), PlayerId::new(42));
        assert!("abc".parse::<PlayerId>().is_err());
    }
}
