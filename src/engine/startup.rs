//! The startup sequencer.
//!
//! Arms the one-shot breakpoints that pause a freshly launched debuggee
//! at a well-defined point. The cheap kinds map straight onto a debug
//! event; the entry-point kinds chase the managed entry point through
//! the image on disk and plant an IL breakpoint before any user code
//! runs. Every resolution failure degrades to an unconditional break on
//! the event that exposed it, so the debuggee never runs away
//! uncontrolled because a header was malformed.

use std::path::{Path, PathBuf};

use strum::{Display, EnumIter};
use tracing::warn;

use crate::{
    cordebug::{CorAssembly, CorModule},
    engine::{
        breakpoints::ConditionContext,
        debugger::Debugger,
        events::{DebugEvent, DebugEventKind},
        pause::PauseState,
    },
    file::{entry_point_token, EntryPoint},
    metadata::{
        reader,
        token::{TableId, Token},
    },
    Result,
};

/// Where a newly launched debuggee should first pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
pub enum BreakProcessKind {
    /// Let the debuggee run
    #[default]
    None,
    /// The process is up under the debugger
    CreateProcess,
    /// The first application domain
    CreateAppDomain,
    /// The first managed thread
    CreateThread,
    /// The first module load
    LoadModule,
    /// The executable's own module load
    ExeLoadModule,
    /// The first class load
    LoadClass,
    /// The first class load in the executable's module
    ExeLoadClass,
    /// The module constructor of the executable, the entry point when
    /// there is none
    ModuleCctorOrEntryPoint,
    /// The managed entry point of the executable
    EntryPoint,
}

/// Arms the startup break for a fresh session. Called before the first
/// callback can arrive.
pub(crate) fn arm_startup_break(
    debugger: &Debugger,
    kind: BreakProcessKind,
    filename: &str,
) -> Result<()> {
    let event_kind = match kind {
        BreakProcessKind::None => return Ok(()),
        BreakProcessKind::CreateProcess => DebugEventKind::CreateProcess,
        BreakProcessKind::CreateAppDomain => DebugEventKind::CreateAppDomain,
        BreakProcessKind::CreateThread => DebugEventKind::CreateThread,
        BreakProcessKind::LoadModule => DebugEventKind::LoadModule,
        BreakProcessKind::LoadClass => return arm_load_class(debugger),
        BreakProcessKind::ExeLoadModule => return arm_exe_load_module(debugger, filename),
        BreakProcessKind::ExeLoadClass => return arm_exe_load_class(debugger, filename),
        BreakProcessKind::ModuleCctorOrEntryPoint => {
            return arm_entry_point(debugger, filename, true);
        }
        BreakProcessKind::EntryPoint => return arm_entry_point(debugger, filename, false),
    };

    debugger.create_debug_event_breakpoint(
        event_kind,
        Some(Box::new(|ctx| {
            ctx.remove_self();
            true
        })),
    )?;
    Ok(())
}

/// Whether `module` is the executable launched as `filename`. Dynamic
/// and in-memory modules never are, whatever their name claims.
fn is_target_module(module: &CorModule, filename: &str) -> bool {
    !module.is_dynamic()
        && !module.is_in_memory()
        && module.name().eq_ignore_ascii_case(filename)
}

/// Class loads are off by default; turn them on for the wait and put
/// the previous setting back once the break fires.
fn arm_load_class(debugger: &Debugger) -> Result<()> {
    let mut options = debugger.options();
    let saved = options.module_class_load_callbacks;
    options.module_class_load_callbacks = true;
    debugger.set_options(options);

    debugger.create_debug_event_breakpoint(
        DebugEventKind::LoadClass,
        Some(Box::new(move |ctx| {
            ctx.remove_self();
            ctx.set_class_load_callbacks_option(saved);
            true
        })),
    )?;
    Ok(())
}

fn arm_exe_load_module(debugger: &Debugger, filename: &str) -> Result<()> {
    let filename = filename.to_string();
    debugger.create_debug_event_breakpoint(
        DebugEventKind::LoadModule,
        Some(Box::new(move |ctx| {
            let DebugEvent::LoadModule { module } = ctx.event else {
                return false;
            };
            if !is_target_module(module, &filename) {
                return false;
            }
            ctx.remove_self();
            true
        })),
    )?;
    Ok(())
}

/// Waits for the executable's module, turns its class-load callbacks
/// on, then breaks on the first class loaded from it.
fn arm_exe_load_class(debugger: &Debugger, filename: &str) -> Result<()> {
    let filename = filename.to_string();
    let mut target: Option<CorModule> = None;
    debugger.create_any_debug_event_breakpoint(Some(Box::new(move |ctx| {
        match ctx.event {
            DebugEvent::LoadModule { module } if is_target_module(module, &filename) => {
                module.enable_class_load_callbacks(true);
                target = Some(module.clone());
                false
            }
            DebugEvent::LoadClass { class } => {
                let Some(target) = &target else {
                    return false;
                };
                if class.module().as_ref() != Some(target) {
                    return false;
                }
                ctx.remove_self();
                true
            }
            _ => false,
        }
    })))?;
    Ok(())
}

/// Waits for the executable's module, then plants an IL breakpoint on
/// its module constructor (when asked for and present) or its managed
/// entry point.
fn arm_entry_point(debugger: &Debugger, filename: &str, want_cctor: bool) -> Result<()> {
    let filename = filename.to_string();
    debugger.create_debug_event_breakpoint(
        DebugEventKind::LoadModule,
        Some(Box::new(move |ctx| {
            let DebugEvent::LoadModule { module } = ctx.event else {
                return false;
            };
            if !is_target_module(module, &filename) {
                return false;
            }
            ctx.remove_self();
            let module = module.clone();
            break_at_module_entry(ctx, &module, want_cctor)
        })),
    )?;
    Ok(())
}

/// Runs inside the target's LoadModule condition; the return value is
/// the condition result. `false` means a breakpoint was queued and the
/// debuggee keeps running until it is hit; `true` is the fallback break.
fn break_at_module_entry(
    ctx: &mut ConditionContext<'_>,
    module: &CorModule,
    want_cctor: bool,
) -> bool {
    if want_cctor {
        if let Some(import) = module.metadata_import() {
            if let Some(token) = reader::global_static_constructor(&*import) {
                return queue_entry_breakpoint(ctx, module, token);
            }
        }
    }

    let entry = match entry_point_token(Path::new(module.name())) {
        Ok(entry) => entry,
        Err(error) => {
            warn!(module = %module, %error, "entry point image unreadable, breaking on load");
            return true;
        }
    };
    if entry.is_none() {
        warn!(module = %module, "no managed entry point, breaking on load");
        return true;
    }

    match entry.other_module {
        Some(name) => forward_to_member_file(ctx, module, &name),
        None if entry.token.table_id() == Some(TableId::MethodDef) => {
            queue_entry_breakpoint(ctx, module, entry.token)
        }
        None => {
            // A token into any other table cannot be resolved to a
            // function; hand control to the user instead of running on
            warn!(module = %module, token = %entry.token, "entry point is not a method, breaking on load");
            true
        }
    }
}

/// The entry point lives in another member file of the launched
/// assembly. Wait for that file's module to load, matched by path and
/// by owning assembly, and chase the entry point into it.
fn forward_to_member_file(
    ctx: &mut ConditionContext<'_>,
    module: &CorModule,
    name: &str,
) -> bool {
    let Some(parent) = Path::new(module.name()).parent() else {
        warn!(module = %module, "executable path has no parent directory, breaking on load");
        return true;
    };
    let other_path: PathBuf = parent.join(name);
    let assembly = module.assembly();

    ctx.add_event_breakpoint(
        DebugEventKind::LoadModule,
        Some(Box::new(move |ctx| {
            let DebugEvent::LoadModule { module } = ctx.event else {
                return false;
            };
            if !is_target_module(module, &other_path.to_string_lossy()) {
                return false;
            }
            if !same_assembly(&assembly, module) {
                return false;
            }
            ctx.remove_self();

            match entry_point_token(&other_path) {
                Ok(EntryPoint {
                    token,
                    other_module: None,
                }) if token.table_id() == Some(TableId::MethodDef) => {
                    let module = module.clone();
                    queue_entry_breakpoint(ctx, &module, token)
                }
                _ => {
                    warn!(module = %module, "member file entry point did not resolve, breaking on load");
                    true
                }
            }
        })),
    );
    false
}

fn same_assembly(expected: &Option<CorAssembly>, module: &CorModule) -> bool {
    match (expected, module.assembly()) {
        (Some(expected), Some(actual)) => *expected == actual,
        _ => false,
    }
}

/// Plants the one-shot IL breakpoint whose hit becomes the
/// entry-point pause.
fn queue_entry_breakpoint(
    ctx: &mut ConditionContext<'_>,
    module: &CorModule,
    token: Token,
) -> bool {
    let Some(module_id) = ctx.module_id(module) else {
        warn!(module = %module, "module left the registry mid-dispatch, breaking on load");
        return true;
    };

    ctx.add_il_breakpoint(
        module_id,
        token,
        0,
        Some(Box::new(|ctx| {
            ctx.remove_self();
            let (app_domain, thread) = match ctx.event {
                DebugEvent::Breakpoint {
                    app_domain, thread, ..
                } => (app_domain.clone(), thread.clone()),
                _ => (None, None),
            };
            ctx.add_pause_state(PauseState::EntryPointBreakpoint { app_domain, thread });
            false
        })),
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{atomic::Ordering, Arc, Mutex};

    use crate::{
        cordebug::{CorClass, CorThread},
        engine::debugger::{DebugProcessOptions, DebuggerProcessState},
        metadata::{
            import::MethodAttributes,
            reader::GLOBAL_TYPE,
            token::Token,
        },
        test::{
            debuggee::{MockClass, MockCorDebug, MockFunction, MockModule, MockProcess, MockThread},
            MockMetadata,
        },
    };

    const EXE: &str = "/tmp/does-not-exist/app.exe";

    fn session(kind: BreakProcessKind) -> Debugger {
        let process = Arc::new(MockProcess::default());
        let raw = Arc::new(MockCorDebug {
            processes: Mutex::new(vec![process.handle()]),
            ..Default::default()
        });
        Debugger::create_process(
            raw.handle(),
            DebugProcessOptions {
                filename: EXE.into(),
                break_kind: kind,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn exe_module(metadata: MockMetadata) -> (Arc<MockModule>, CorModule) {
        let module = Arc::new(MockModule {
            name: Some(EXE.into()),
            metadata: Arc::new(metadata),
            ..Default::default()
        });
        let cor_module = CorModule::new(module.handle());
        (module, cor_module)
    }

    fn load(debugger: &Debugger, module: &CorModule) {
        debugger
            .process_event(DebugEvent::LoadModule {
                module: module.clone(),
            })
            .unwrap();
    }

    #[test]
    fn test_none_kind_arms_nothing() {
        let debugger = session(BreakProcessKind::None);
        let (_, module) = exe_module(MockMetadata::new());
        load(&debugger, &module);
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
    }

    #[test]
    fn test_create_thread_break_is_one_shot() {
        let debugger = session(BreakProcessKind::CreateThread);
        let event = || DebugEvent::CreateThread {
            thread: CorThread::new(Arc::new(MockThread::default()).handle()),
        };

        debugger.process_event(event()).unwrap();
        assert_eq!(debugger.process_state(), DebuggerProcessState::Paused);

        debugger.continue_run().unwrap();
        debugger.process_event(event()).unwrap();
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
    }

    #[test]
    fn test_load_class_break_restores_the_option() {
        let debugger = session(BreakProcessKind::LoadClass);
        assert!(debugger.options().module_class_load_callbacks);

        // Modules loading during the wait get the callbacks enabled
        let (raw_module, module) = exe_module(MockMetadata::new());
        load(&debugger, &module);
        assert_eq!(*raw_module.class_load_callbacks.lock().unwrap(), vec![true]);

        let class = CorClass::new(Arc::new(MockClass::default()).handle());
        debugger
            .process_event(DebugEvent::LoadClass { class })
            .unwrap();

        assert_eq!(debugger.process_state(), DebuggerProcessState::Paused);
        assert!(!debugger.options().module_class_load_callbacks);
    }

    #[test]
    fn test_exe_load_module_matches_the_target_only() {
        let debugger = session(BreakProcessKind::ExeLoadModule);

        let other = Arc::new(MockModule {
            name: Some("/tmp/does-not-exist/helper.dll".into()),
            ..Default::default()
        });
        load(&debugger, &CorModule::new(other.handle()));
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);

        // Name comparison ignores case
        let target = Arc::new(MockModule {
            name: Some("/tmp/does-not-exist/APP.EXE".into()),
            ..Default::default()
        });
        load(&debugger, &CorModule::new(target.handle()));
        assert_eq!(debugger.process_state(), DebuggerProcessState::Paused);
    }

    #[test]
    fn test_in_memory_module_is_never_the_target() {
        let debugger = session(BreakProcessKind::ExeLoadModule);
        let module = Arc::new(MockModule {
            name: Some(EXE.into()),
            is_in_memory: true,
            ..Default::default()
        });
        load(&debugger, &CorModule::new(module.handle()));
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
    }

    #[test]
    fn test_exe_load_class_waits_for_a_class_of_the_target() {
        let debugger = session(BreakProcessKind::ExeLoadClass);

        let (raw_module, module) = exe_module(MockMetadata::new());
        load(&debugger, &module);
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
        assert_eq!(*raw_module.class_load_callbacks.lock().unwrap(), vec![true]);

        // A class of some other module does not end the wait
        let stray = CorClass::new(Arc::new(MockClass::default()).handle());
        debugger
            .process_event(DebugEvent::LoadClass { class: stray })
            .unwrap();
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);

        let own = Arc::new(MockClass {
            token: 0x0200_0002,
            module: Some(raw_module.handle()),
            ..Default::default()
        });
        debugger
            .process_event(DebugEvent::LoadClass {
                class: CorClass::new(own.handle()),
            })
            .unwrap();
        assert_eq!(debugger.process_state(), DebuggerProcessState::Paused);
    }

    #[test]
    fn test_unreadable_entry_point_falls_back_to_break_on_load() {
        let debugger = session(BreakProcessKind::EntryPoint);
        let (_, module) = exe_module(MockMetadata::new());
        load(&debugger, &module);
        // The image does not exist on disk; the sequencer breaks rather
        // than losing the debuggee
        assert_eq!(debugger.process_state(), DebuggerProcessState::Paused);
    }

    #[test]
    fn test_module_cctor_gets_the_il_breakpoint() {
        let cctor = Token::new(0x0600_0007);
        let mut metadata = MockMetadata::new();
        metadata.add_method(
            GLOBAL_TYPE,
            cctor,
            ".cctor",
            MethodAttributes::RT_SPECIAL_NAME
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::STATIC,
            &[0x00, 0x00, 0x01],
        );

        let function = Arc::new(MockFunction {
            token: cctor.value(),
            ..Default::default()
        });
        let module = Arc::new(MockModule {
            name: Some(EXE.into()),
            metadata: Arc::new(metadata),
            functions: Mutex::new([(cctor.value(), function.handle())].into_iter().collect()),
            ..Default::default()
        });
        let cor_module = CorModule::new(module.handle());

        let debugger = session(BreakProcessKind::ModuleCctorOrEntryPoint);
        load(&debugger, &cor_module);

        // No pause yet; the IL breakpoint on the .cctor is planted
        assert_eq!(debugger.process_state(), DebuggerProcessState::Running);
        let planted = {
            let plants = function.il_breakpoints.lock().unwrap();
            assert_eq!(plants.len(), 1);
            assert_eq!(plants[0].0, 0);
            plants[0].1.clone()
        };

        debugger
            .process_event(DebugEvent::Breakpoint {
                app_domain: None,
                thread: None,
                breakpoint: crate::cordebug::CorCodeBreakpoint::new(
                    crate::cordebug::NativeHandle::new(
                        planted.clone()
                            as Arc<dyn crate::cordebug::raw::RawCodeBreakpoint>,
                    ),
                ),
            })
            .unwrap();

        assert_eq!(
            debugger.pause_states(),
            vec![PauseState::EntryPointBreakpoint {
                app_domain: None,
                thread: None,
            }]
        );
        // One-shot: the planted breakpoint was deactivated on removal
        assert!(!planted.active.load(Ordering::SeqCst));
    }
}
