/// Configuration macros
///
/// `config_struct!` declares a config section with its defaults inline.

/// Define a configuration struct with embedded defaults
///
/// Generates the struct with public fields, a `Default` impl using the given
/// values, and serde support with `#[serde(default)]`.
///
/// # Example
/// ```
/// signalbot::config_struct! {
///     pub struct PacingConfig {
///         item_interval_ms: u64 = 2000,
///         enabled: bool = true,
///     }
/// }
/// assert_eq!(PacingConfig::default().item_interval_ms, 2000);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
