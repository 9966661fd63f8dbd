//! The breakpoint table.
//!
//! Breakpoints live in one explicit table keyed by [`BreakpointId`];
//! conditions never hold references to their own entry. A condition
//! receives a [`ConditionContext`] carrying the triggering event and its
//! own id, and effects — removal, pause states, new breakpoints — are
//! queued as [`EngineOp`]s the engine applies after the condition
//! returns. A condition therefore never re-enters the table it is being
//! called from.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::{
    cordebug::{CorCodeBreakpoint, CorModule, DnModuleId},
    engine::{
        debugger::{DebugOptions, ModuleRegistry},
        events::{DebugEvent, DebugEventKind},
        pause::PauseState,
    },
    metadata::token::Token,
};

/// Identity of a registered breakpoint. Ids are monotonic in
/// registration order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(pub(crate) u64);

impl std::fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BP#{}", self.0)
    }
}

/// What a breakpoint triggers on.
#[derive(Debug, Clone)]
pub enum BreakpointKind {
    /// One raw debug event kind
    DebugEvent {
        /// The event kind to trigger on
        kind: DebugEventKind,
    },
    /// Every debug event
    AnyDebugEvent,
    /// An IL offset in a method of a module, bound when the module loads
    IlCode {
        /// Identity of the module to bind in
        module: DnModuleId,
        /// `MethodDef` token of the method
        token: Token,
        /// IL offset within the method
        offset: u32,
    },
    /// A native offset in the jitted code of a method
    NativeCode {
        /// Identity of the module to bind in
        module: DnModuleId,
        /// `MethodDef` token of the method
        token: Token,
        /// Native offset within the jitted code
        offset: u32,
    },
}

/// A breakpoint condition. Returning `true` pauses the debuggee with
/// the breakpoint's default pause state; effects beyond that are queued
/// through the context.
pub type BreakpointCondition = Box<dyn FnMut(&mut ConditionContext<'_>) -> bool + Send>;

/// An effect queued by a condition, applied by the engine after the
/// condition returns.
pub(crate) enum EngineOp {
    /// Remove a breakpoint (deactivating its planted code breakpoint)
    RemoveBreakpoint(BreakpointId),
    /// Push a pause state for this dispatch
    AddPauseState(PauseState),
    /// Set the module-class-load-callbacks option
    SetClassLoadCallbacksOption(bool),
    /// Register a debug-event breakpoint
    AddEventBreakpoint {
        kind: DebugEventKind,
        condition: Option<BreakpointCondition>,
    },
    /// Register an IL breakpoint, binding it if the module is loaded
    AddIlBreakpoint {
        module: DnModuleId,
        token: Token,
        offset: u32,
        condition: Option<BreakpointCondition>,
    },
}

/// What a condition sees and can do while it runs.
pub struct ConditionContext<'a> {
    /// The event that triggered the breakpoint
    pub event: &'a DebugEvent,
    /// Id of the breakpoint whose condition is running
    pub id: BreakpointId,
    /// The debugger's options at dispatch time
    pub options: DebugOptions,
    pub(crate) modules: &'a ModuleRegistry,
    pub(crate) ops: Vec<EngineOp>,
}

impl ConditionContext<'_> {
    /// Queues removal of the breakpoint this condition belongs to.
    pub fn remove_self(&mut self) {
        let id = self.id;
        self.remove_breakpoint(id);
    }

    /// Queues removal of a breakpoint.
    pub fn remove_breakpoint(&mut self, id: BreakpointId) {
        self.ops.push(EngineOp::RemoveBreakpoint(id));
    }

    /// Queues a pause state for this dispatch.
    pub fn add_pause_state(&mut self, state: PauseState) {
        self.ops.push(EngineOp::AddPauseState(state));
    }

    /// Queues a change of the module-class-load-callbacks option.
    pub fn set_class_load_callbacks_option(&mut self, enable: bool) {
        self.ops.push(EngineOp::SetClassLoadCallbacksOption(enable));
    }

    /// Queues registration of a debug-event breakpoint.
    pub fn add_event_breakpoint(
        &mut self,
        kind: DebugEventKind,
        condition: Option<BreakpointCondition>,
    ) {
        self.ops.push(EngineOp::AddEventBreakpoint { kind, condition });
    }

    /// Queues registration of an IL breakpoint at `offset` in the method
    /// `token` of `module`.
    pub fn add_il_breakpoint(
        &mut self,
        module: DnModuleId,
        token: Token,
        offset: u32,
        condition: Option<BreakpointCondition>,
    ) {
        self.ops.push(EngineOp::AddIlBreakpoint {
            module,
            token,
            offset,
            condition,
        });
    }

    /// The registered identity of a loaded module, `None` when the
    /// module is not (or no longer) in the registry.
    #[must_use]
    pub fn module_id(&self, module: &CorModule) -> Option<DnModuleId> {
        self.modules.id_of(module)
    }
}

pub(crate) struct BreakpointEntry {
    pub kind: BreakpointKind,
    /// `None` is an unconditional breakpoint
    pub condition: Option<BreakpointCondition>,
    /// The planted native breakpoint, once an IL/native kind has bound
    pub code: Option<CorCodeBreakpoint>,
}

impl BreakpointEntry {
    /// Whether the entry triggers on `event`. IL/native entries trigger
    /// on Breakpoint events reporting their own planted code breakpoint.
    pub fn matches(&self, event: &DebugEvent) -> bool {
        match &self.kind {
            BreakpointKind::DebugEvent { kind } => *kind == event.kind(),
            BreakpointKind::AnyDebugEvent => true,
            BreakpointKind::IlCode { .. } | BreakpointKind::NativeCode { .. } => match event {
                DebugEvent::Breakpoint { breakpoint, .. } => {
                    self.code.as_ref() == Some(breakpoint)
                }
                _ => false,
            },
        }
    }
}

/// The breakpoint table. Entries are only ever mutated through their id;
/// iteration goes through a sorted id snapshot so dispatch order is
/// registration order.
pub(crate) struct BreakpointTable {
    next_id: AtomicU64,
    pub entries: DashMap<BreakpointId, BreakpointEntry>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        BreakpointTable {
            next_id: AtomicU64::new(1),
            entries: DashMap::new(),
        }
    }

    pub fn insert(
        &self,
        kind: BreakpointKind,
        condition: Option<BreakpointCondition>,
    ) -> BreakpointId {
        let id = BreakpointId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.entries.insert(
            id,
            BreakpointEntry {
                kind,
                condition,
                code: None,
            },
        );
        id
    }

    /// Removes a breakpoint, deactivating its planted code breakpoint.
    /// Returns whether the entry existed; removal happens exactly once
    /// no matter how often it is queued.
    pub fn remove(&self, id: BreakpointId) -> bool {
        match self.entries.remove(&id) {
            Some((_, entry)) => {
                if let Some(code) = entry.code {
                    code.activate(false);
                }
                true
            }
            None => false,
        }
    }

    /// Ids in registration order.
    pub fn ids_in_order(&self) -> Vec<BreakpointId> {
        let mut ids: Vec<BreakpointId> = self.entries.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }
}
