use crate::{Error, Result};
use serde::Serialize;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Read-only response data plus a weak link back to the client that fetched
/// it, used by follow-up calls such as `player.get_club()`.
///
/// `H` is the client's handle, [`crate::Handle`] or
/// [`crate::blocking::Handle`]; use the `Model<T>` aliases of either mode.
pub struct Model<T, H> {
    data: T,
    client: Weak<H>,
}

impl<T, H> Model<T, H> {
    pub(crate) fn new(data: T, client: Weak<H>) -> Self {
        Self { data, client }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_inner(self) -> T {
        self.data
    }

    /// Wrap `data` for the same client as `self`.
    pub(crate) fn child<U>(&self, data: U) -> Model<U, H> {
        Model::new(data, self.client.clone())
    }

    pub(crate) fn client(&self) -> Result<Arc<H>> {
        self.client.upgrade().ok_or(Error::ClientClosed)
    }
}

impl<T, H> Deref for Model<T, H> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T: Clone, H> Clone for Model<T, H> {
    fn clone(&self) -> Self {
        self.child(self.data.clone())
    }
}

impl<T: std::fmt::Debug, H> std::fmt::Debug for Model<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.data.fmt(f)
    }
}

impl<T: PartialEq, H> PartialEq<T> for Model<T, H> {
    fn eq(&self, other: &T) -> bool {
        self.data == *other
    }
}

impl<T: Serialize, H> Serialize for Model<T, H> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}
