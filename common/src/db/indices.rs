use std::fmt::Debug;

/// Dense `u32` handle into one of the cell or technology tables.
macro_rules! define_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline(always)]
            pub fn new(id: usize) -> Self {
                Self(id as u32)
            }
            #[inline(always)]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
            /// The element of `table` this handle points at, if it is in range.
            pub fn lookup<T>(self, table: &[T]) -> Option<&T> {
                table.get(self.index())
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_index!(
    /// Position in `Technology::layers`. Layer order follows the config file.
    LayerId
);
define_index!(
    /// Position in `CellLayout::nets`.
    NetId
);
define_index!(
    /// Position in `CellLayout::shapes`.
    ShapeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_bounds_checked() {
        let names = ["metal1", "via1"];
        assert_eq!(LayerId::new(1).lookup(&names), Some(&"via1"));
        assert_eq!(LayerId::new(2).lookup(&names), None);
        assert_eq!(format!("{:?}", NetId(7)), "NetId(7)");
    }
}
