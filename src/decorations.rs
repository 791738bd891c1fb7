//! Decoration store for ASL
//!
//! Each semantic pass attaches facts to AST nodes by [`NodeId`] rather than
//! by tree pointer (§3), so the store is just a handful of parallel maps
//! instead of a second tree. SymbolPass writes `scope`; TypeCheckPass writes
//! `type`/`is_lvalue`; CodeGenPass writes `addr`/`offset`/`code`.

use std::collections::HashMap;

use crate::node::NodeId;
use crate::symbols::ScopeId;
use crate::types::TypeId;

#[derive(Default)]
pub struct DecorationStore {
    scope: HashMap<NodeId, ScopeId>,
    ty: HashMap<NodeId, TypeId>,
    is_lvalue: HashMap<NodeId, bool>,
    addr: HashMap<NodeId, String>,
    offset: HashMap<NodeId, String>,
    code: HashMap<NodeId, String>,
}

impl DecorationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scope(&mut self, node: NodeId, scope: ScopeId) {
        self.scope.insert(node, scope);
    }

    pub fn scope(&self, node: NodeId) -> Option<ScopeId> {
        self.scope.get(&node).copied()
    }

    pub fn set_type(&mut self, node: NodeId, ty: TypeId) {
        self.ty.insert(node, ty);
    }

    pub fn ty(&self, node: NodeId) -> Option<TypeId> {
        self.ty.get(&node).copied()
    }

    pub fn set_is_lvalue(&mut self, node: NodeId, is_lvalue: bool) {
        self.is_lvalue.insert(node, is_lvalue);
    }

    pub fn is_lvalue(&self, node: NodeId) -> bool {
        self.is_lvalue.get(&node).copied().unwrap_or(false)
    }

    /// Names a temporary, a symbol, or an immediate — whatever operand text
    /// later uses of this node's value should reference (§3).
    pub fn set_addr(&mut self, node: NodeId, addr: impl Into<String>) {
        self.addr.insert(node, addr.into());
    }

    pub fn addr(&self, node: NodeId) -> Option<&str> {
        self.addr.get(&node).map(String::as_str)
    }

    /// Non-empty iff the referent is an array element; names the temporary
    /// holding the evaluated index, so a later assignment can re-address the
    /// same slot (§4.7).
    pub fn set_offset(&mut self, node: NodeId, offset: impl Into<String>) {
        self.offset.insert(node, offset.into());
    }

    pub fn offset(&self, node: NodeId) -> Option<&str> {
        self.offset.get(&node).map(String::as_str)
    }

    pub fn has_offset(&self, node: NodeId) -> bool {
        self.offset.get(&node).is_some_and(|s| !s.is_empty())
    }

    pub fn set_code(&mut self, node: NodeId, code: String) {
        self.code.insert(node, code);
    }

    pub fn code(&self, node: NodeId) -> Option<&str> {
        self.code.get(&node).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::GLOBAL_SCOPE;
    use crate::types::TypeRegistry;

    #[test]
    fn unset_decorations_are_absent() {
        let store = DecorationStore::new();
        assert!(store.ty(NodeId(0)).is_none());
        assert!(!store.is_lvalue(NodeId(0)));
        assert!(store.addr(NodeId(0)).is_none());
        assert!(!store.has_offset(NodeId(0)));
    }

    #[test]
    fn each_decoration_kind_round_trips_independently() {
        let reg = TypeRegistry::new();
        let mut store = DecorationStore::new();
        let n = NodeId(7);

        store.set_scope(n, GLOBAL_SCOPE);
        store.set_type(n, reg.integer());
        store.set_is_lvalue(n, true);
        store.set_addr(n, "%4");
        store.set_offset(n, "%1");
        store.set_code(n, "LOAD 4".to_string());

        assert_eq!(store.scope(n), Some(GLOBAL_SCOPE));
        assert_eq!(store.ty(n), Some(reg.integer()));
        assert!(store.is_lvalue(n));
        assert_eq!(store.addr(n), Some("%4"));
        assert_eq!(store.offset(n), Some("%1"));
        assert!(store.has_offset(n));
        assert_eq!(store.code(n), Some("LOAD 4"));
    }

    #[test]
    fn empty_offset_means_whole_value_not_array_element() {
        let mut store = DecorationStore::new();
        store.set_offset(NodeId(0), "");
        assert!(!store.has_offset(NodeId(0)));
    }

    #[test]
    fn decorations_are_keyed_per_node_not_shared() {
        let reg = TypeRegistry::new();
        let mut store = DecorationStore::new();
        store.set_type(NodeId(1), reg.integer());
        store.set_type(NodeId(2), reg.float());
        assert_eq!(store.ty(NodeId(1)), Some(reg.integer()));
        assert_eq!(store.ty(NodeId(2)), Some(reg.float()));
    }
}
