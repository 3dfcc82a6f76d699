//! Macros for reducing boilerplate when defining entities
//!
//! These macros generate the struct, its static field descriptor set and
//! the [`Entity`](crate::core::entity::Entity) implementation.

/// Define an entity struct with automatic trait implementations
///
/// An `id: i64` identity is always generated first; `0` means "not yet
/// persisted". Every declared field type must convert into
/// [`FieldValue`](crate::core::field::FieldValue).
///
/// Optional trailing sections declare foreign keys (`name: column => "target"`),
/// many-valued relations (`name => "target" through "join_table"`) and a
/// version column used for optimistic concurrency on update.
///
/// # Example
///
/// ```rust,ignore
/// use scaffold::prelude::*;
///
/// impl_entity!(
///     Order,
///     "order",
///     {
///         total: Decimal,
///         placed_at: DateTime<Utc>,
///         customer_id: Option<i64>,
///         version: i64,
///     },
///     foreign_keys { customer: customer_id => "customer" },
///     many_to_many { items => "item" through "order_items" },
///     version = version
/// );
///
/// let order = Order::new(Decimal::new(1250, 2), Utc::now(), Some(1), 0);
/// assert_eq!(order.id, 0);
/// ```
#[macro_export]
macro_rules! impl_entity {
    (@version) => {
        None
    };
    (@version $version:ident) => {
        Some(stringify!($version))
    };
    (
        $(#[$struct_meta:meta])*
        $type:ident,
        $type_name:literal,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
        $(, foreign_keys { $( $fk_name:ident : $fk_column:ident => $fk_target:literal ),* $(,)? } )?
        $(, many_to_many { $( $m2m_name:ident => $m2m_target:literal through $m2m_through:literal ),* $(,)? } )?
        $(, version = $version:ident )?
        $(,)?
    ) => {
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
        $(#[$struct_meta])*
        pub struct $type {
            /// Unique identifier, assigned by the store on insert
            #[serde(default)]
            pub id: i64,
            $( $(#[$field_meta])* pub $field : $field_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            fn meta() -> &'static $crate::core::entity::EntityMeta {
                static META: $crate::core::entity::EntityMeta = $crate::core::entity::EntityMeta {
                    entity_type: $type_name,
                    fields: &["id", $( stringify!($field) ),*],
                    foreign_keys: &[ $( $(
                        $crate::core::entity::ForeignKey {
                            name: stringify!($fk_name),
                            column: stringify!($fk_column),
                            target: $fk_target,
                        }
                    ),* )? ],
                    many_to_many: &[ $( $(
                        $crate::core::entity::ManyToMany {
                            name: stringify!($m2m_name),
                            target: $m2m_target,
                            through: $m2m_through,
                        }
                    ),* )? ],
                    version_field: $crate::impl_entity!(@version $( $version )?),
                };
                &META
            }

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                match field {
                    "id" => Some($crate::core::field::FieldValue::Integer(self.id)),
                    $( stringify!($field) => Some($crate::core::field::FieldValue::from(self.$field.clone())), )*
                    _ => None,
                }
            }
        }

        impl $type {
            /// Create a new, not yet persisted instance
            #[allow(dead_code, clippy::too_many_arguments)]
            pub fn new( $( $field: $field_type ),* ) -> Self {
                Self {
                    id: 0,
                    $( $field ),*
                }
            }
        }
    };
}
