use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const PROFILE_HANDLE_MAX_LEN: usize = 40;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// Per-user record. Post mutations only look it up; none of its fields are read.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Profile {
    pub user: Id<UserMarker>,
    pub handle: ProfileHandle,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct ProfileHandle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The profile handle is invalid: {0}")]
pub struct InvalidProfileHandleError(String);

impl ProfileHandle {
    pub fn new(handle: String) -> Result<Self, InvalidProfileHandleError> {
        if !handle.is_empty() && handle.chars().count() <= PROFILE_HANDLE_MAX_LEN {
            Ok(ProfileHandle(handle))
        } else {
            Err(InvalidProfileHandleError(handle))
        }
    }

    /// Default handle for a user that has not picked one.
    #[must_use]
    pub fn for_user(user: Id<UserMarker>) -> Self {
        ProfileHandle(format!("user{user}"))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ProfileHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        ProfileHandle::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"ProfileHandle"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::profile::{PROFILE_HANDLE_MAX_LEN, ProfileHandle};

    #[test]
    fn handle_length() {
        assert!(ProfileHandle::new(String::new()).is_err());
        assert!(ProfileHandle::new("a".repeat(PROFILE_HANDLE_MAX_LEN)).is_ok());
        assert!(ProfileHandle::new("a".repeat(PROFILE_HANDLE_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn generated_handle_is_valid() {
        let handle = ProfileHandle::for_user(u64::MAX.into());

        assert!(ProfileHandle::new(handle.get().to_owned()).is_ok());
    }
}
