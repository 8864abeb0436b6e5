#![forbid(unsafe_code)]

use std::collections::HashMap;

use pulse_ast::FunctionDef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostFnId(pub u32);

/// Builtin operations passed through to the target by name. These are never
/// inlined and never dispatched remotely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Quantity,
    Delay,
    At,
    Now,
    Syscall,
    Range,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Quantity,
        Builtin::Delay,
        Builtin::At,
        Builtin::Now,
        Builtin::Syscall,
        Builtin::Range,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Quantity => "Quantity",
            Builtin::Delay => "delay",
            Builtin::At => "at",
            Builtin::Now => "now",
            Builtin::Syscall => "syscall",
            Builtin::Range => "range",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    Second,
    Hertz,
}

impl Unit {
    pub const ALL: [Unit; 2] = [Unit::Second, Unit::Hertz];

    /// Name of the base-unit constant the code generator links against.
    pub fn base_constant(self) -> &'static str {
        match self {
            Unit::Second => "base_s_unit",
            Unit::Hertz => "base_Hz_unit",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Second => "s",
            Unit::Hertz => "Hz",
        }
    }
}

/// A dimensioned number, always held in its base unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantity {
    pub amount: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(amount: f64, unit: Unit) -> Self {
        Self { amount, unit }
    }
}

/// Timeline-context markers exposed to kernels as bare names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Singleton {
    Sequential,
    Parallel,
}

impl Singleton {
    pub const ALL: [Singleton; 2] = [Singleton::Sequential, Singleton::Parallel];

    pub fn name(self) -> &'static str {
        match self {
            Singleton::Sequential => "sequential",
            Singleton::Parallel => "parallel",
        }
    }
}

/// A kernel function together with the owner it is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelRef {
    pub owner: OwnerId,
    pub function: FunctionId,
}

/// What a call target turns out to be once resolved. Decides the three-way
/// treatment of every call site: embed, inline, or dispatch remotely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callable {
    Embeddable(Builtin),
    Kernel(KernelRef),
    HostFn(HostFnId),
}

/// A host-side runtime value as seen by the inliner.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Quantity(Quantity),
    Singleton(Singleton),
    Object(OwnerId),
    Callable(Callable),
}

impl Value {
    pub fn kernel(owner: OwnerId, function: FunctionId) -> Value {
        Value::Callable(Callable::Kernel(KernelRef { owner, function }))
    }

    pub fn display(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Str(s) => format!("{s:?}"),
            Value::Quantity(q) => format!("{} {}", q.amount, q.unit.symbol()),
            Value::Singleton(s) => s.name().to_string(),
            Value::Object(o) => format!("<host object {}>", o.0),
            Value::Callable(Callable::Embeddable(b)) => format!("<builtin {}>", b.name()),
            Value::Callable(Callable::Kernel(_)) => "<kernel function>".to_string(),
            Value::Callable(Callable::HostFn(f)) => format!("<host function {}>", f.0),
        }
    }
}

struct ModuleData {
    bindings: HashMap<String, Value>,
}

struct OwnerData {
    name: String,
    module: ModuleId,
    attrs: HashMap<String, Value>,
}

struct HostFnData {
    name: String,
}

/// Registry of everything host-side the inliner can see: module environments,
/// owner objects with their attribute tables, parsed kernel definitions, and
/// the identities of functions that stay on the host. The compiler driver
/// populates one of these ahead of an inlining request; the inliner only
/// reads it.
pub struct Host {
    modules: Vec<ModuleData>,
    owners: Vec<OwnerData>,
    functions: Vec<FunctionDef>,
    host_fns: Vec<HostFnData>,
}

impl Host {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            owners: Vec::new(),
            functions: Vec::new(),
            host_fns: Vec::new(),
        }
    }

    /// Allocates a module environment pre-seeded with the prelude bindings.
    pub fn new_module(&mut self) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(ModuleData {
            bindings: prelude(),
        });
        id
    }

    /// Adds or replaces a module-level binding.
    pub fn bind(&mut self, module: ModuleId, name: &str, value: Value) {
        self.modules[module.0 as usize]
            .bindings
            .insert(name.to_string(), value);
    }

    pub fn binding(&self, module: ModuleId, name: &str) -> Option<&Value> {
        self.modules[module.0 as usize].bindings.get(name)
    }

    /// Allocates a host object attached to its defining module. The name is
    /// only used in diagnostics.
    pub fn new_owner(&mut self, module: ModuleId, name: &str) -> OwnerId {
        let id = OwnerId(self.owners.len() as u32);
        self.owners.push(OwnerData {
            name: name.to_string(),
            module,
            attrs: HashMap::new(),
        });
        id
    }

    pub fn set_attr(&mut self, owner: OwnerId, name: &str, value: Value) {
        self.owners[owner.0 as usize]
            .attrs
            .insert(name.to_string(), value);
    }

    pub fn attr(&self, owner: OwnerId, name: &str) -> Option<&Value> {
        self.owners[owner.0 as usize].attrs.get(name)
    }

    pub fn owner_name(&self, owner: OwnerId) -> &str {
        &self.owners[owner.0 as usize].name
    }

    pub fn owner_module(&self, owner: OwnerId) -> ModuleId {
        self.owners[owner.0 as usize].module
    }

    /// Registers a parsed kernel definition. Source-to-tree parsing happens
    /// upstream; the inliner fetches definitions from here by handle.
    pub fn register_function(&mut self, def: FunctionDef) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(def);
        id
    }

    pub fn function_def(&self, function: FunctionId) -> &FunctionDef {
        &self.functions[function.0 as usize]
    }

    /// Registers the identity of a function that stays on the host and is
    /// reached through the remote-call mechanism.
    pub fn register_host_fn(&mut self, name: &str) -> HostFnId {
        let id = HostFnId(self.host_fns.len() as u32);
        self.host_fns.push(HostFnData {
            name: name.to_string(),
        });
        id
    }

    pub fn host_fn_name(&self, host_fn: HostFnId) -> &str {
        &self.host_fns[host_fn.0 as usize].name
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard bindings every kernel module starts with: the embeddable
/// builtins, the timeline singletons, and SI-scaled unit constants.
fn prelude() -> HashMap<String, Value> {
    let mut bindings = HashMap::new();
    for builtin in Builtin::ALL {
        bindings.insert(
            builtin.name().to_string(),
            Value::Callable(Callable::Embeddable(builtin)),
        );
    }
    for singleton in Singleton::ALL {
        bindings.insert(singleton.name().to_string(), Value::Singleton(singleton));
    }
    let units = [
        ("s", 1.0, Unit::Second),
        ("ms", 1e-3, Unit::Second),
        ("us", 1e-6, Unit::Second),
        ("ns", 1e-9, Unit::Second),
        ("Hz", 1.0, Unit::Hertz),
        ("kHz", 1e3, Unit::Hertz),
        ("MHz", 1e6, Unit::Hertz),
        ("GHz", 1e9, Unit::Hertz),
    ];
    for (name, amount, unit) in units {
        bindings.insert(
            name.to_string(),
            Value::Quantity(Quantity::new(amount, unit)),
        );
    }
    bindings
}
