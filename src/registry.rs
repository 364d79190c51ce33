use crate::dependency::Dependency;

/// Link-time registration of the application's base dependencies, collected via inventory.
/// `create` is called once per `base_dependencies()` call, in link order.
pub struct Registration {
    pub create: fn() -> Dependency,
}

inventory::collect!(Registration);

/// Declare a base dependency from a `fn() -> Dependency` path.
///
/// ```ignore
/// fn core() -> Dependency { Dependency::wrap("Services.Core", app::core()) }
/// mmg_testenv::declare_dependency!(core);
/// ```
#[macro_export]
macro_rules! declare_dependency {
    ($create:path) => {
        $crate::inventory::submit! {
            $crate::registry::Registration { create: $create }
        }
    };
}

/// Every declared dependency, freshly built.
pub fn base_dependencies() -> Vec<Dependency> {
    inventory::iter::<Registration>
        .into_iter()
        .map(|reg| (reg.create)())
        .collect()
}
