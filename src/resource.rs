//! The cached value type.

use time::OffsetDateTime;

/// An immutable value paired with the instant after which it must not be used.
///
/// Produced by a fetch delegate and replaced wholesale on renewal; the
/// provider and its callers only ever read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringResource<T> {
    value: T,
    expires_at: OffsetDateTime,
}

impl<T> ExpiringResource<T> {
    /// Creates a resource that expires at `expires_at`.
    pub const fn new(value: T, expires_at: OffsetDateTime) -> Self {
        Self { value, expires_at }
    }

    /// Returns the cached value.
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Returns the expiration instant.
    pub const fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Consumes the resource, returning the value.
    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn accessors_return_constructor_inputs() {
        let expires_at = OffsetDateTime::now_utc() + Duration::from_secs(30);
        let resource = ExpiringResource::new("token".to_string(), expires_at);

        assert_eq!(resource.value(), "token");
        assert_eq!(resource.expires_at(), expires_at);
        assert_eq!(resource.into_value(), "token");
    }
}
