#![forbid(unsafe_code)]

use std::collections::HashMap;

use pulse_ast::{Expr, ExprKind};
use pulse_host::{Builtin, Host, HostFnId, OwnerId, Singleton, Unit, Value};

use crate::encode::{encode_value, ident_expr};
use crate::error::{InlineError, Result};
use crate::eval::{describe_ref, eval_static};

/// One logical variable: the same local name means different things in
/// different functions and on different owners, and must stay distinct after
/// all of them are flattened into one body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ScopeKey {
    owner: OwnerId,
    func: String,
    local: String,
}

#[derive(Clone, Debug)]
enum Binding {
    /// A mutable local, given a globally unique name.
    Renamed(String),
    /// An already-resolved expression standing in for the name.
    Subtree(Expr),
    /// A host value re-encoded as a literal at every use. Never assignable.
    Constant(Value),
}

/// Remote calls collected during one session: callable identity to dense,
/// zero-based id, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RpcRegistry {
    entries: Vec<HostFnId>,
    ids: HashMap<HostFnId, u32>,
}

impl RpcRegistry {
    /// Returns the callable's id, assigning the next one on first use.
    pub fn id_for(&mut self, host_fn: HostFnId) -> u32 {
        if let Some(&id) = self.ids.get(&host_fn) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(host_fn);
        self.ids.insert(host_fn, id);
        id
    }

    pub fn get(&self, host_fn: HostFnId) -> Option<u32> {
        self.ids.get(&host_fn).copied()
    }

    /// Registered callables in id order.
    pub fn entries(&self) -> &[HostFnId] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-request inlining state: the scope-key table, the name allocator, and
/// the remote-call registry. One session covers one top-level request and
/// every call inlined into it, so renamed names and remote ids are unique
/// across the whole flattened output. Sessions are never reused.
pub struct Session {
    bindings: HashMap<ScopeKey, Binding>,
    use_count: HashMap<String, u32>,
    rpc: RpcRegistry,
}

impl Session {
    pub fn new() -> Self {
        let mut use_count = HashMap::new();
        for builtin in Builtin::ALL {
            use_count.insert(builtin.name().to_string(), 1);
        }
        for unit in Unit::ALL {
            use_count.insert(unit.base_constant().to_string(), 1);
        }
        for singleton in Singleton::ALL {
            use_count.insert(singleton.name().to_string(), 1);
        }
        Self {
            bindings: HashMap::new(),
            use_count,
            rpc: RpcRegistry::default(),
        }
    }

    /// Allocates a name that cannot collide with any name handed out before.
    /// A base already in use gets its current use count as a suffix; a base
    /// that ends in a digit is first extended with `_` so user names like
    /// `x1` stay disjoint from the generated `x` + suffix family. Reserved
    /// names start with a use count of 1 and are therefore never returned
    /// bare.
    pub fn new_name(&mut self, base: &str) -> String {
        let mut base = base.to_string();
        if base.ends_with(|c: char| c.is_ascii_digit()) {
            base.push('_');
        }
        match self.use_count.get_mut(&base) {
            Some(count) => {
                let name = format!("{base}{count}");
                *count += 1;
                name
            }
            None => {
                self.use_count.insert(base.clone(), 1);
                base
            }
        }
    }

    /// Resolves one variable/member/index reference in `owner.func`.
    ///
    /// Plain names go through the scope-key table: a first store allocates a
    /// renamed variable, later references return whatever the key is bound
    /// to. Unbound loads (and member/index references, which carry no local
    /// name) fall back to the owner's module environment and fold to a
    /// literal when the value there is encodable.
    pub fn resolve(
        &mut self,
        host: &Host,
        owner: OwnerId,
        func: &str,
        target: &Expr,
        store: bool,
    ) -> Result<Expr> {
        if let ExprKind::Ident(ident) = &target.kind {
            let key = ScopeKey {
                owner,
                func: func.to_string(),
                local: ident.node.clone(),
            };
            if store && !self.bindings.contains_key(&key) {
                let renamed = self.new_name(&ident.node);
                let resolved = ident_expr(target.span, &renamed);
                self.bindings.insert(key, Binding::Renamed(renamed));
                return Ok(resolved);
            }
            match self.bindings.get(&key) {
                Some(Binding::Renamed(name)) => {
                    return Ok(ident_expr(target.span, name));
                }
                Some(Binding::Subtree(expr)) => {
                    if store {
                        return Err(InlineError::ImmutableRebind {
                            name: ident.node.clone(),
                            owner: host.owner_name(owner).to_string(),
                            func: func.to_string(),
                            span: target.span,
                        });
                    }
                    return Ok(expr.clone());
                }
                Some(Binding::Constant(value)) => {
                    if store {
                        return Err(InlineError::ImmutableRebind {
                            name: ident.node.clone(),
                            owner: host.owner_name(owner).to_string(),
                            func: func.to_string(),
                            span: target.span,
                        });
                    }
                    return match encode_value(value, target.span) {
                        Some(expr) => Ok(expr),
                        None => Err(InlineError::UnrepresentableValue {
                            value: value.display(),
                            owner: host.owner_name(owner).to_string(),
                            func: func.to_string(),
                            span: target.span,
                        }),
                    };
                }
                None => {}
            }
        }
        if !store {
            let module = host.owner_module(owner);
            if let Some(value) = eval_static(host, module, &HashMap::new(), target) {
                if let Some(expr) = encode_value(&value, target.span) {
                    return Ok(expr);
                }
            }
        }
        Err(InlineError::UnresolvedReference {
            name: describe_ref(target),
            owner: host.owner_name(owner).to_string(),
            func: func.to_string(),
            span: target.span,
        })
    }

    /// Registers a read-only binding that folds to a host value.
    pub fn bind_constant(&mut self, owner: OwnerId, func: &str, local: &str, value: Value) {
        self.bindings.insert(
            ScopeKey {
                owner,
                func: func.to_string(),
                local: local.to_string(),
            },
            Binding::Constant(value),
        );
    }

    /// Registers a read-only binding that substitutes an expression.
    pub fn bind_subtree(&mut self, owner: OwnerId, func: &str, local: &str, expr: Expr) {
        self.bindings.insert(
            ScopeKey {
                owner,
                func: func.to_string(),
                local: local.to_string(),
            },
            Binding::Subtree(expr),
        );
    }

    /// All folded-constant bindings of `owner.func`, for call-target
    /// evaluation. Renamed variables and substituted subtrees are not part
    /// of the evaluation environment.
    pub fn constants_of(&self, owner: OwnerId, func: &str) -> HashMap<String, Value> {
        self.bindings
            .iter()
            .filter_map(|(key, binding)| match binding {
                Binding::Constant(value) if key.owner == owner && key.func == func => {
                    Some((key.local.clone(), value.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn rpc_id(&mut self, host_fn: HostFnId) -> u32 {
        self.rpc.id_for(host_fn)
    }

    pub fn rpc_registry(&self) -> &RpcRegistry {
        &self.rpc
    }

    pub fn into_rpc_registry(self) -> RpcRegistry {
        self.rpc
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
