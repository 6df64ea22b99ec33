use std::fmt;

/// A list with at least one element.
///
/// Splicing a possibly-empty list onto either side of a nonempty one keeps it
/// nonempty; these are the only ways terminalizers combine the two shapes.
#[derive(Clone, PartialEq, Eq)]
pub struct NonEmpty<T> {
    pub head: T,
    pub tail: Vec<T>,
}

impl<T> NonEmpty<T> {
    pub fn new(head: T) -> Self {
        NonEmpty {
            head,
            tail: Vec::new(),
        }
    }

    pub fn from_vec(v: Vec<T>) -> Option<Self> {
        let mut iter = v.into_iter();
        let head = iter.next()?;
        Some(NonEmpty {
            head,
            tail: iter.collect(),
        })
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn first(&self) -> &T {
        &self.head
    }

    pub fn last(&self) -> &T {
        self.tail.last().unwrap_or(&self.head)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    /// `prefix ++ self`.
    pub fn prepend(self, prefix: Vec<T>) -> Self {
        let mut prefix = prefix.into_iter();
        match prefix.next() {
            None => self,
            Some(head) => {
                let mut tail: Vec<T> = prefix.collect();
                tail.reserve(self.len());
                tail.push(self.head);
                tail.extend(self.tail);
                NonEmpty { head, tail }
            }
        }
    }

    /// `self ++ suffix`.
    pub fn append(mut self, suffix: Vec<T>) -> Self {
        self.tail.extend(suffix);
        self
    }

    pub fn into_vec(self) -> Vec<T> {
        let mut v = Vec::with_capacity(self.len());
        v.push(self.head);
        v.extend(self.tail);
        v
    }
}

impl<T: fmt::Debug> fmt::Debug for NonEmpty<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} :| {:?}", self.head, self.tail)
    }
}

impl<T> IntoIterator for NonEmpty<T> {
    type Item = T;
    type IntoIter = std::iter::Chain<std::iter::Once<T>, std::vec::IntoIter<T>>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self.head).chain(self.tail)
    }
}
