/// A slot in a `Slots` vector reserved ahead of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPos(usize);

impl SlotPos {
    pub fn at(idx: usize) -> SlotPos {
        SlotPos(idx)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A vector whose positions can be reserved before they are filled.
///
/// Unlike a plain vector the index of a reserved position never shifts, so it
/// can be handed out as a stable id while the value is still being built.
#[derive(Debug)]
pub struct Slots<T> {
    vec: Vec<Option<T>>,
}

impl<T> Slots<T> {
    pub fn new() -> Slots<T> {
        Slots { vec: Vec::new() }
    }

    /// Reserve the next position in the vector.
    pub fn reserve_next(&mut self) -> SlotPos {
        let idx = self.vec.len();
        self.vec.push(None);
        SlotPos(idx)
    }

    /// Fill a previously reserved position. Returns the value back if the
    /// position was already filled.
    pub fn fill(&mut self, pos: SlotPos, value: T) -> Result<(), T> {
        match &mut self.vec[pos.0] {
            Some(_) => Err(value),
            slot => {
                *slot = Some(value);
                Ok(())
            }
        }
    }

    /// Convert into a plain vector, or report the first position that was
    /// reserved but never filled.
    pub fn into_vec(self) -> Result<Vec<T>, SlotPos> {
        let mut out = Vec::with_capacity(self.vec.len());
        for (idx, v) in self.vec.into_iter().enumerate() {
            match v {
                Some(v) => out.push(v),
                None => return Err(SlotPos(idx)),
            }
        }
        Ok(out)
    }
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Slots::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_in_order() {
        let mut s = Slots::new();
        let p1 = s.reserve_next();
        let p2 = s.reserve_next();
        s.fill(p1, 1).unwrap();
        s.fill(p2, 2).unwrap();
        assert_eq!(s.into_vec().unwrap(), vec![1, 2]);
    }

    #[test]
    fn fill_out_of_order() {
        let mut s = Slots::new();
        let p1 = s.reserve_next();
        let p2 = s.reserve_next();
        let p3 = s.reserve_next();
        s.fill(p3, 3).unwrap();
        s.fill(p1, 1).unwrap();
        s.fill(p2, 2).unwrap();
        assert_eq!(s.into_vec().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn double_fill_rejected() {
        let mut s = Slots::new();
        let p = s.reserve_next();
        s.fill(p, 1).unwrap();
        assert_eq!(s.fill(p, 2), Err(2));
        assert_eq!(s.into_vec().unwrap(), vec![1]);
    }

    #[test]
    fn unfilled_reported() {
        let mut s: Slots<i32> = Slots::new();
        s.reserve_next();
        let p = s.reserve_next();
        s.fill(SlotPos(0), 0).unwrap();
        assert_eq!(s.into_vec().unwrap_err(), p);
    }
}
