/// What a full call yields: the mapped row-set and the mapped output parameters.
///
/// `list` is `None` when no row-set was produced or no row mapper was supplied;
/// `object` is `None` when no output types and mapper were supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct CallTuple<T, U> {
    pub list: Option<Vec<T>>,
    pub object: Option<U>,
}

impl<T, U> CallTuple<T, U> {
    #[must_use]
    pub fn new(list: Option<Vec<T>>, object: Option<U>) -> Self {
        Self { list, object }
    }

    #[must_use]
    pub fn list(&self) -> Option<&[T]> {
        self.list.as_deref()
    }

    #[must_use]
    pub fn object(&self) -> Option<&U> {
        self.object.as_ref()
    }

    #[must_use]
    pub fn into_parts(self) -> (Option<Vec<T>>, Option<U>) {
        (self.list, self.object)
    }
}

impl<T, U> Default for CallTuple<T, U> {
    fn default() -> Self {
        Self {
            list: None,
            object: None,
        }
    }
}
