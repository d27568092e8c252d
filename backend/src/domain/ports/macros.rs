//! Macro behind the enrollment port error enums.
//!
//! [`EnrollmentStoreError`](super::EnrollmentStoreError) and
//! [`EnrollmentRecordStoreError`](super::EnrollmentRecordStoreError) are
//! declared as a list of variants with their display messages. The macro
//! derives `thiserror::Error` plus the comparisons the classifier and the
//! mocks rely on, and adds one snake_case constructor per variant. Constructor
//! arguments accept anything convertible into the field type, so adapters can
//! pass `&str` messages and `EventId`/`ProgramId` where a `ResourceId` is
//! stored.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[must_use]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),+ }) => {
        ::paste::paste! {
            #[must_use]
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),+) -> Self {
                Self::$variant { $($field: $field.into()),+ }
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),+ $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),+ } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),+ } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;
