/// Static [AlignmentInfo](crate::alignment::AlignmentInfo) of an algorithm together with its
/// [AlignmentInfoTrait](crate::alignment::AlignmentInfoTrait) implementation
macro_rules! alignment_info {
    ($name: ident, $algorithm: ty, $($field: ident: $value: expr),* $(,)?) => {
        lazy_static::lazy_static! {
            static ref $name: $crate::alignment::AlignmentInfo = $crate::alignment::AlignmentInfo {
                $($field: $value),*
            };
        }

        impl $crate::alignment::AlignmentInfoTrait for $algorithm {
            fn info(&self) -> &$crate::alignment::AlignmentInfo {
                &$name
            }
        }
    };
}
