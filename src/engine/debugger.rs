//! The debugging session.
//!
//! One [`Debugger`] owns one debuggee process for its whole life:
//! Starting until the first callback, then Running and Paused in
//! alternation, finally Terminated. All debug events funnel through
//! [`Debugger::process_event`] on the callback thread; dispatch is
//! serialized behind a mutex, so breakpoint conditions and the native
//! calls they cause never run concurrently.
//!
//! Pausing is a decision, not a side effect: a dispatch that collects at
//! least one [`PauseState`] synchronizes the process, anything else
//! continues it. Value and metadata reads against live handles are
//! guarded by the paused state; a running debuggee would hand back
//! garbage or worse.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::{
    cordebug::{
        raw::RawCorDebug,
        CorEval, CorModule, CorProcess, CorStepper, CorThread, CorValue, DnModuleId, Hr,
        NativeHandle, ProcessLaunch,
    },
    engine::{
        breakpoints::{
            BreakpointCondition, BreakpointId, BreakpointKind, BreakpointTable, ConditionContext,
            EngineOp,
        },
        events::{DebugEvent, DebugEventKind},
        pause::PauseState,
        startup::{self, BreakProcessKind},
    },
    metadata::{import::MetadataImport, token::Token},
    values::{read_simple_type_value, ValueResult},
    Error, Result,
};

/// Lifecycle state of the debuggee process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerProcessState {
    /// Launched or attached, no callback seen yet
    Starting,
    /// Running freely
    Running,
    /// Synchronized; live handles may be used
    Paused,
    /// Exited or detached; the session is over
    Terminated,
}

/// Tunable behavior of a session. Options can change mid-session; each
/// dispatch reads the current values.
#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    /// Enable LoadClass/UnloadClass callbacks on every module as it
    /// loads
    pub module_class_load_callbacks: bool,
    /// Pause on first-chance exceptions, not only unhandled ones
    pub break_on_exception: bool,
    /// JIT compiler flags applied to each module as it loads
    pub jit_flags: Option<u32>,
}

/// Parameters for launching a debuggee.
#[derive(Debug, Clone, Default)]
pub struct DebugProcessOptions {
    /// Path of the executable
    pub filename: String,
    /// Command line, the executable path is prepended when absent
    pub cmdline: Option<String>,
    /// Working directory of the debuggee
    pub current_dir: Option<String>,
    /// Where the startup sequencer should break
    pub break_kind: BreakProcessKind,
}

/// Parameters for attaching to a running process.
#[derive(Debug, Clone, Default)]
pub struct AttachProcessOptions {
    /// Id of the process to attach to
    pub pid: u32,
    /// Where the startup sequencer should break. Kinds that match on
    /// the executable path never trigger on attach; the path of an
    /// already-running process is not known to the sequencer.
    pub break_kind: BreakProcessKind,
}

/// Loaded modules, indexed three ways: by serialized identity, by
/// wrapper identity and by base address. Dynamic and in-memory modules
/// take a serial from one counter so equal metadata names stay distinct.
pub(crate) struct ModuleRegistry {
    by_id: DashMap<DnModuleId, CorModule>,
    ids: DashMap<CorModule, DnModuleId>,
    by_address: SkipMap<u64, CorModule>,
    next_serial: AtomicU32,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry {
            by_id: DashMap::new(),
            ids: DashMap::new(),
            by_address: SkipMap::new(),
            next_serial: AtomicU32::new(0),
        }
    }

    pub fn register(&self, module: &CorModule) -> DnModuleId {
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let id = module.module_id(serial);
        self.by_id.insert(id.clone(), module.clone());
        self.ids.insert(module.clone(), id.clone());
        if module.address() != 0 {
            self.by_address.insert(module.address(), module.clone());
        }
        id
    }

    pub fn unregister(&self, module: &CorModule) {
        if let Some((_, id)) = self.ids.remove(module) {
            self.by_id.remove(&id);
        }
        if module.address() != 0 {
            self.by_address.remove(&module.address());
        }
    }

    pub fn find(&self, id: &DnModuleId) -> Option<CorModule> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    pub fn id_of(&self, module: &CorModule) -> Option<DnModuleId> {
        self.ids.get(module).map(|entry| entry.value().clone())
    }

    /// The module whose image covers `address`.
    pub fn module_at(&self, address: u64) -> Option<CorModule> {
        let entry = self
            .by_address
            .upper_bound(std::ops::Bound::Included(&address))?;
        let module = entry.value();
        if address < module.address() + u64::from(module.size()) {
            Some(module.clone())
        } else {
            None
        }
    }

    /// All registered modules, ordered by base address then the rest.
    pub fn all(&self) -> Vec<CorModule> {
        let mut found: Vec<CorModule> = self
            .by_address
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for entry in &self.by_id {
            if entry.value().address() == 0 {
                found.push(entry.value().clone());
            }
        }
        found
    }
}

/// A debugging session over one debuggee process.
pub struct Debugger {
    raw: NativeHandle<dyn RawCorDebug>,
    process: CorProcess,
    state: Mutex<DebuggerProcessState>,
    options: Mutex<DebugOptions>,
    pause_states: Mutex<Vec<PauseState>>,
    breakpoints: BreakpointTable,
    modules: ModuleRegistry,
    dispatch: Mutex<()>,
}

impl Debugger {
    /// Launches `options.filename` under the debugger.
    ///
    /// # Errors
    /// Fails when the native launch fails; the startup sequencer is
    /// armed before the first callback can arrive.
    pub fn create_process(
        raw: NativeHandle<dyn RawCorDebug>,
        options: DebugProcessOptions,
    ) -> Result<Debugger> {
        let launch = ProcessLaunch {
            filename: options.filename.clone(),
            cmdline: options.cmdline.clone(),
            current_dir: options.current_dir.clone(),
        };
        let process = CorProcess::new(raw.create_process(&launch)?);
        debug!(filename = %options.filename, "launched debuggee");

        let debugger = Debugger::with_process(raw, process);
        startup::arm_startup_break(&debugger, options.break_kind, &options.filename)?;
        Ok(debugger)
    }

    /// Attaches to the process `options.pid`.
    ///
    /// # Errors
    /// Fails when the native attach fails.
    pub fn attach(
        raw: NativeHandle<dyn RawCorDebug>,
        options: AttachProcessOptions,
    ) -> Result<Debugger> {
        let process = CorProcess::new(raw.attach(options.pid)?);
        debug!(pid = options.pid, "attached to debuggee");

        let debugger = Debugger::with_process(raw, process);
        startup::arm_startup_break(&debugger, options.break_kind, "")?;
        Ok(debugger)
    }

    fn with_process(raw: NativeHandle<dyn RawCorDebug>, process: CorProcess) -> Debugger {
        Debugger {
            raw,
            process,
            state: Mutex::new(DebuggerProcessState::Starting),
            options: Mutex::new(DebugOptions::default()),
            pause_states: Mutex::new(Vec::new()),
            breakpoints: BreakpointTable::new(),
            modules: ModuleRegistry::new(),
            dispatch: Mutex::new(()),
        }
    }

    /// The debuggee process.
    #[must_use]
    pub fn process(&self) -> &CorProcess {
        &self.process
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn process_state(&self) -> DebuggerProcessState {
        *lock!(self.state)
    }

    /// Whether the debuggee is synchronized.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.process_state() == DebuggerProcessState::Paused
    }

    /// The reasons the debuggee is currently paused, in the order they
    /// were collected. Empty while running.
    #[must_use]
    pub fn pause_states(&self) -> Vec<PauseState> {
        lock!(self.pause_states).clone()
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> DebugOptions {
        lock!(self.options).clone()
    }

    /// Replaces the options. Takes effect from the next event and the
    /// next module load.
    pub fn set_options(&self, options: DebugOptions) {
        *lock!(self.options) = options;
    }

    fn ensure_live(&self) -> Result<()> {
        if self.process_state() == DebuggerProcessState::Terminated {
            return Err(Error::Terminated);
        }
        Ok(())
    }

    fn ensure_paused(&self) -> Result<()> {
        match self.process_state() {
            DebuggerProcessState::Terminated => Err(Error::Terminated),
            DebuggerProcessState::Paused => Ok(()),
            _ => Err(Error::NotPaused),
        }
    }

    /// Registers a breakpoint on one debug event kind.
    ///
    /// # Errors
    /// The session must not be terminated.
    pub fn create_debug_event_breakpoint(
        &self,
        kind: DebugEventKind,
        condition: Option<BreakpointCondition>,
    ) -> Result<BreakpointId> {
        self.ensure_live()?;
        Ok(self
            .breakpoints
            .insert(BreakpointKind::DebugEvent { kind }, condition))
    }

    /// Registers a breakpoint triggering on every debug event.
    ///
    /// # Errors
    /// The session must not be terminated.
    pub fn create_any_debug_event_breakpoint(
        &self,
        condition: Option<BreakpointCondition>,
    ) -> Result<BreakpointId> {
        self.ensure_live()?;
        Ok(self.breakpoints.insert(BreakpointKind::AnyDebugEvent, condition))
    }

    /// Registers an IL breakpoint at `offset` in the method `token` of
    /// the module identified by `module`. Binds immediately when the
    /// module is loaded, otherwise on its LoadModule.
    ///
    /// # Errors
    /// The session must not be terminated and the token must not be nil.
    pub fn create_il_breakpoint(
        &self,
        module: DnModuleId,
        token: Token,
        offset: u32,
        condition: Option<BreakpointCondition>,
    ) -> Result<BreakpointId> {
        self.ensure_live()?;
        if token.is_null() {
            return Err(Error::InvalidArgument("nil method token"));
        }
        let id = self.breakpoints.insert(
            BreakpointKind::IlCode {
                module,
                token,
                offset,
            },
            condition,
        );
        self.bind_code_breakpoint(id);
        Ok(id)
    }

    /// Registers a native-code breakpoint, same binding rules as
    /// [`Debugger::create_il_breakpoint`].
    ///
    /// # Errors
    /// The session must not be terminated and the token must not be nil.
    pub fn create_native_breakpoint(
        &self,
        module: DnModuleId,
        token: Token,
        offset: u32,
        condition: Option<BreakpointCondition>,
    ) -> Result<BreakpointId> {
        self.ensure_live()?;
        if token.is_null() {
            return Err(Error::InvalidArgument("nil method token"));
        }
        let id = self.breakpoints.insert(
            BreakpointKind::NativeCode {
                module,
                token,
                offset,
            },
            condition,
        );
        self.bind_code_breakpoint(id);
        Ok(id)
    }

    /// Removes a breakpoint, deactivating any planted code breakpoint.
    /// Returns whether it existed.
    pub fn remove_breakpoint(&self, id: BreakpointId) -> bool {
        self.breakpoints.remove(id)
    }

    /// Handles one debug event. This is the callback-thread entry
    /// point: bookkeeping, breakpoint dispatch, then the pause/continue
    /// decision.
    ///
    /// # Errors
    /// The session must not be terminated.
    pub fn process_event(&self, event: DebugEvent) -> Result<()> {
        let _dispatch = lock!(self.dispatch);
        self.ensure_live()?;
        debug!(kind = %event.kind(), "debug event");

        match &event {
            DebugEvent::LoadModule { module } => self.register_module(module),
            DebugEvent::UnloadModule { module } => self.modules.unregister(module),
            _ => {}
        }

        self.dispatch_breakpoints(&event);
        self.builtin_pause_states(&event);

        if let DebugEvent::ExitProcess { .. } = event {
            *lock!(self.state) = DebuggerProcessState::Terminated;
            lock!(self.pause_states).clear();
            debug!("debuggee exited");
            return Ok(());
        }

        let pending = lock!(self.pause_states).len();
        if pending != 0 {
            self.process.stop();
            *lock!(self.state) = DebuggerProcessState::Paused;
            debug!(states = pending, "paused");
        } else {
            self.process.continue_run(false);
            *lock!(self.state) = DebuggerProcessState::Running;
        }
        Ok(())
    }

    fn register_module(&self, module: &CorModule) {
        let options = self.options();
        if options.module_class_load_callbacks {
            module.enable_class_load_callbacks(true);
        }
        if let Some(flags) = options.jit_flags {
            module.set_jit_compiler_flags(flags);
        }

        self.modules.register(module);
        debug!(module = %module, "module loaded");

        // Pending IL/native breakpoints waiting for this module bind now
        for id in self.breakpoints.ids_in_order() {
            self.bind_code_breakpoint(id);
        }
    }

    fn bind_code_breakpoint(&self, id: BreakpointId) {
        let Some(mut entry) = self.breakpoints.entries.get_mut(&id) else {
            return;
        };
        if entry.code.is_some() {
            return;
        }
        let (module_id, token, offset, native) = match &entry.kind {
            BreakpointKind::IlCode {
                module,
                token,
                offset,
            } => (module.clone(), *token, *offset, false),
            BreakpointKind::NativeCode {
                module,
                token,
                offset,
            } => (module.clone(), *token, *offset, true),
            _ => return,
        };

        let Some(module) = self.modules.find(&module_id) else {
            return;
        };
        let Some(function) = module.function_from_token(token) else {
            warn!(%id, %token, "method token did not resolve, breakpoint stays unbound");
            return;
        };
        let planted = if native {
            function.create_native_breakpoint(offset)
        } else {
            function.create_breakpoint(offset)
        };
        match planted {
            Some(code) => {
                code.activate(true);
                trace!(%id, %token, offset, "code breakpoint bound");
                entry.code = Some(code);
            }
            None => warn!(%id, %token, offset, "could not plant code breakpoint"),
        }
    }

    fn dispatch_breakpoints(&self, event: &DebugEvent) {
        for id in self.breakpoints.ids_in_order() {
            let mut pending_state = None;
            let ops;
            {
                let Some(mut entry) = self.breakpoints.entries.get_mut(&id) else {
                    continue;
                };
                if !entry.matches(event) {
                    continue;
                }

                let mut ctx = ConditionContext {
                    event,
                    id,
                    options: self.options(),
                    modules: &self.modules,
                    ops: Vec::new(),
                };
                let triggered = match entry.condition.as_mut() {
                    Some(condition) => condition(&mut ctx),
                    None => true,
                };
                ops = ctx.ops;
                trace!(%id, triggered, "breakpoint condition evaluated");

                if triggered {
                    pending_state = Some(default_pause_state(&entry.kind, id, event));
                }
            }

            // The entry guard is gone; ops may touch the table freely
            self.apply_ops(ops);
            if let Some(state) = pending_state {
                lock!(self.pause_states).push(state);
            }
        }
    }

    fn builtin_pause_states(&self, event: &DebugEvent) {
        let state = match event {
            DebugEvent::Break { .. } => Some(PauseState::Break),
            DebugEvent::Exception { unhandled: true, .. } => Some(PauseState::UnhandledException),
            DebugEvent::Exception {
                unhandled: false, ..
            } => self
                .options()
                .break_on_exception
                .then_some(PauseState::Exception),
            DebugEvent::EvalComplete { .. } | DebugEvent::EvalException { .. } => {
                Some(PauseState::Eval)
            }
            _ => None,
        };
        if let Some(state) = state {
            lock!(self.pause_states).push(state);
        }
    }

    fn apply_ops(&self, ops: Vec<EngineOp>) {
        for op in ops {
            match op {
                EngineOp::RemoveBreakpoint(id) => {
                    self.breakpoints.remove(id);
                }
                EngineOp::AddPauseState(state) => lock!(self.pause_states).push(state),
                EngineOp::SetClassLoadCallbacksOption(enable) => {
                    lock!(self.options).module_class_load_callbacks = enable;
                }
                EngineOp::AddEventBreakpoint { kind, condition } => {
                    self.breakpoints
                        .insert(BreakpointKind::DebugEvent { kind }, condition);
                }
                EngineOp::AddIlBreakpoint {
                    module,
                    token,
                    offset,
                    condition,
                } => {
                    let id = self.breakpoints.insert(
                        BreakpointKind::IlCode {
                            module,
                            token,
                            offset,
                        },
                        condition,
                    );
                    self.bind_code_breakpoint(id);
                }
            }
        }
    }

    /// Resumes the debuggee, clearing the collected pause states.
    ///
    /// # Errors
    /// The debuggee must be paused.
    pub fn continue_run(&self) -> Result<()> {
        self.ensure_paused()?;
        lock!(self.pause_states).clear();
        self.process.continue_run(false);
        *lock!(self.state) = DebuggerProcessState::Running;
        Ok(())
    }

    /// Synchronizes the debuggee at the user's request. A no-op while
    /// already paused.
    ///
    /// # Errors
    /// The session must not be terminated; a failed native stop is
    /// reported as the failing call.
    pub fn try_break(&self) -> Result<()> {
        self.ensure_live()?;
        if self.is_paused() {
            return Ok(());
        }
        if !self.process.stop() {
            return Err(Error::NativeCall(Hr::FAIL.0));
        }
        lock!(self.pause_states).push(PauseState::UserBreak);
        *lock!(self.state) = DebuggerProcessState::Paused;
        Ok(())
    }

    /// Detaches from the debuggee, leaving it running. Ends the session.
    ///
    /// # Errors
    /// The session must not be terminated.
    pub fn detach(&self) -> Result<()> {
        self.ensure_live()?;
        self.process.detach();
        *lock!(self.state) = DebuggerProcessState::Terminated;
        Ok(())
    }

    /// Terminates the debuggee and ends the session. Idempotent.
    pub fn terminate(&self, exit_code: u32) {
        if self.process_state() == DebuggerProcessState::Terminated {
            return;
        }
        self.process.terminate(exit_code);
        *lock!(self.state) = DebuggerProcessState::Terminated;
    }

    /// Shuts the native debugging services down. Call after the session
    /// is over.
    pub fn shutdown(&self) {
        if self.raw.terminate().is_err() {
            warn!("native debugging services did not shut down cleanly");
        }
    }

    /// Reads a simple value from the debuggee.
    ///
    /// # Errors
    /// The debuggee must be paused; a running debuggee's memory is not
    /// readable.
    pub fn read_value(&self, value: Option<&CorValue>) -> Result<ValueResult> {
        self.ensure_paused()?;
        Ok(read_simple_type_value(value, self.process.pointer_size()))
    }

    /// The metadata import of a loaded module. `Ok(None)` when the
    /// native query fails.
    ///
    /// # Errors
    /// The debuggee must be paused.
    pub fn module_metadata(&self, module: &CorModule) -> Result<Option<Arc<dyn MetadataImport>>> {
        self.ensure_paused()?;
        Ok(module.metadata_import())
    }

    /// Creates a stepper on `thread`. `Ok(None)` when the native call
    /// fails.
    ///
    /// # Errors
    /// The debuggee must be paused.
    pub fn create_stepper(&self, thread: &CorThread) -> Result<Option<CorStepper>> {
        self.ensure_paused()?;
        Ok(thread.create_stepper())
    }

    /// Creates a function evaluation on `thread`. `Ok(None)` when the
    /// native call fails.
    ///
    /// # Errors
    /// The debuggee must be paused.
    pub fn create_eval(&self, thread: &CorThread) -> Result<Option<CorEval>> {
        self.ensure_paused()?;
        Ok(thread.create_eval())
    }

    /// A loaded module by its serialized identity.
    #[must_use]
    pub fn find_module(&self, id: &DnModuleId) -> Option<CorModule> {
        self.modules.find(id)
    }

    /// The loaded module whose image covers `address`.
    #[must_use]
    pub fn module_at_address(&self, address: u64) -> Option<CorModule> {
        self.modules.module_at(address)
    }

    /// All loaded modules.
    #[must_use]
    pub fn modules(&self) -> Vec<CorModule> {
        self.modules.all()
    }
}

fn default_pause_state(kind: &BreakpointKind, id: BreakpointId, event: &DebugEvent) -> PauseState {
    let (app_domain, thread) = match event {
        DebugEvent::Breakpoint {
            app_domain, thread, ..
        } => (app_domain.clone(), thread.clone()),
        _ => (None, None),
    };

    match kind {
        BreakpointKind::DebugEvent { .. } => PauseState::DebugEventBreakpoint { id },
        BreakpointKind::AnyDebugEvent => PauseState::AnyDebugEventBreakpoint { id },
        BreakpointKind::IlCode { .. } => PauseState::IlCodeBreakpoint {
            id,
            app_domain,
            thread,
        },
        BreakpointKind::NativeCode { .. } => PauseState::NativeCodeBreakpoint {
            id,
            app_domain,
            thread,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::{
        cordebug::CorCodeBreakpoint,
        test::debuggee::{MockCorDebug, MockFunction, MockModule, MockProcess, MockThread},
    };

    fn session() -> (Arc<MockProcess>, Debugger) {
        let process = Arc::new(MockProcess {
            pid: 4242,
            ..Default::default()
        });
        let raw = Arc::new(MockCorDebug {
            processes: Mutex::new(vec![process.handle()]),
            ..Default::default()
        });
        let debugger = Debugger::create_process(
            raw.handle(),
            DebugProcessOptions {
                filename: "C:\\test\\app.exe".into(),
                ..Default::default()
            },
        )
        .unwrap();
        (process, debugger)
    }

    fn thread_event() -> DebugEvent {
        let thread = Arc::new(MockThread::default());
        DebugEvent::CreateThread {
            thread: crate::cordebug::CorThread::new(thread.handle()),
        }
    }

    #[test]
    fn test_create_process_starts_in_starting_state() {
        let (_, debugger) = session();
        assert_eq!(debugger.process_state(), DebuggerProcessState::Starting);
        assert_eq!(debugger.process().pid(), Some(4242));
        assert!(debugger.pause_states().is_empty());
    }

    #[test]
    fn test_event_without_breakpoints_continues() {
        let (process, debugger) = session();
        debugger.process_event(thread_event()).unwrap();

        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
        assert_eq!(process.continues.load(Ordering::SeqCst), 1);
        assert_eq!(process.stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_matching_breakpoint_pauses() {
        let (process, debugger) = session();
        let id = debugger
            .create_debug_event_breakpoint(DebugEventKind::CreateThread, None)
            .unwrap();

        debugger.process_event(thread_event()).unwrap();

        assert_eq!(debugger.process_state(), DebuggerProcessState::Paused);
        assert_eq!(process.stops.load(Ordering::SeqCst), 1);
        assert_eq!(
            debugger.pause_states(),
            vec![PauseState::DebugEventBreakpoint { id }]
        );
    }

    #[test]
    fn test_false_condition_keeps_running_and_keeps_breakpoint() {
        let (_, debugger) = session();
        let id = debugger
            .create_debug_event_breakpoint(
                DebugEventKind::CreateThread,
                Some(Box::new(|_ctx| false)),
            )
            .unwrap();

        debugger.process_event(thread_event()).unwrap();
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);

        // Still registered: a later matching event triggers
        debugger.process_event(thread_event()).unwrap();
        assert!(debugger.remove_breakpoint(id));
    }

    #[test]
    fn test_one_shot_removes_itself_through_the_context() {
        let (_, debugger) = session();
        let id = debugger
            .create_debug_event_breakpoint(
                DebugEventKind::CreateThread,
                Some(Box::new(|ctx| {
                    ctx.remove_self();
                    true
                })),
            )
            .unwrap();

        debugger.process_event(thread_event()).unwrap();
        assert_eq!(
            debugger.pause_states(),
            vec![PauseState::DebugEventBreakpoint { id }]
        );

        debugger.continue_run().unwrap();
        debugger.process_event(thread_event()).unwrap();
        // Gone: no pause, no second trigger
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
        assert!(!debugger.remove_breakpoint(id));
    }

    #[test]
    fn test_il_breakpoint_binds_on_module_load_and_triggers() {
        let (_, debugger) = session();

        let function = Arc::new(MockFunction {
            token: 0x0600_0001,
            ..Default::default()
        });
        let module = Arc::new(MockModule {
            name: Some("C:\\test\\app.exe".into()),
            functions: Mutex::new(
                [(0x0600_0001_u32, function.handle())].into_iter().collect(),
            ),
            ..Default::default()
        });
        let cor_module = CorModule::new(module.handle());
        let module_id = cor_module.module_id(0);

        let id = debugger
            .create_il_breakpoint(module_id, Token::new(0x0600_0001), 0, None)
            .unwrap();
        assert!(function.il_breakpoints.lock().unwrap().is_empty());

        debugger
            .process_event(DebugEvent::LoadModule {
                module: cor_module.clone(),
            })
            .unwrap();

        let planted = {
            let plants = function.il_breakpoints.lock().unwrap();
            assert_eq!(plants.len(), 1);
            assert_eq!(plants[0].0, 0);
            plants[0].1.clone()
        };
        assert!(planted.active.load(Ordering::SeqCst));

        debugger
            .process_event(DebugEvent::Breakpoint {
                app_domain: None,
                thread: None,
                breakpoint: CorCodeBreakpoint::new(crate::cordebug::NativeHandle::new(
                    planted as Arc<dyn crate::cordebug::raw::RawCodeBreakpoint>,
                )),
            })
            .unwrap();

        assert_eq!(
            debugger.pause_states(),
            vec![PauseState::IlCodeBreakpoint {
                id,
                app_domain: None,
                thread: None,
            }]
        );
    }

    #[test]
    fn test_nil_token_is_rejected() {
        let (_, debugger) = session();
        let result =
            debugger.create_il_breakpoint(DnModuleId::default(), Token::new(0), 0, None);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_value_reads_require_the_paused_state() {
        let (_, debugger) = session();
        assert!(matches!(debugger.read_value(None), Err(Error::NotPaused)));

        debugger.try_break().unwrap();
        assert_eq!(debugger.read_value(None).unwrap(), ValueResult::Invalid);
    }

    #[test]
    fn test_try_break_pushes_user_break_once() {
        let (process, debugger) = session();
        debugger.try_break().unwrap();
        debugger.try_break().unwrap();

        assert_eq!(debugger.pause_states(), vec![PauseState::UserBreak]);
        assert_eq!(process.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exit_process_terminates_the_session() {
        let (_, debugger) = session();
        let process = debugger.process().clone();
        debugger
            .process_event(DebugEvent::ExitProcess { process })
            .unwrap();

        assert_eq!(debugger.process_state(), DebuggerProcessState::Terminated);
        assert!(matches!(
            debugger.process_event(thread_event()),
            Err(Error::Terminated)
        ));
        assert!(matches!(
            debugger.create_any_debug_event_breakpoint(None),
            Err(Error::Terminated)
        ));
    }

    #[test]
    fn test_unhandled_exception_pauses() {
        let (_, debugger) = session();
        debugger
            .process_event(DebugEvent::Exception {
                thread: None,
                unhandled: true,
            })
            .unwrap();
        assert_eq!(
            debugger.pause_states(),
            vec![PauseState::UnhandledException]
        );

        // First-chance exceptions only pause when asked for
        debugger.continue_run().unwrap();
        debugger
            .process_event(DebugEvent::Exception {
                thread: None,
                unhandled: false,
            })
            .unwrap();
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
    }

    #[test]
    fn test_module_registry_tracks_loads_and_unloads() {
        let (_, debugger) = session();
        let module = Arc::new(MockModule {
            name: Some("C:\\test\\app.exe".into()),
            base_address: 0x0040_0000,
            size: 0x2000,
            ..Default::default()
        });
        let cor_module = CorModule::new(module.handle());
        let module_id = cor_module.module_id(0);

        debugger
            .process_event(DebugEvent::LoadModule {
                module: cor_module.clone(),
            })
            .unwrap();
        assert_eq!(debugger.find_module(&module_id), Some(cor_module.clone()));
        assert_eq!(
            debugger.module_at_address(0x0040_1000),
            Some(cor_module.clone())
        );
        assert_eq!(debugger.module_at_address(0x0050_0000), None);

        debugger
            .process_event(DebugEvent::UnloadModule {
                module: cor_module.clone(),
            })
            .unwrap();
        assert_eq!(debugger.find_module(&module_id), None);
        assert!(debugger.modules().is_empty());
    }
}
