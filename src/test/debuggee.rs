//! Scriptable debuggee fixtures.
//!
//! Each `Mock*` type implements one raw interface trait over plain
//! fields: `Option` fields script failures (`None` fails the call),
//! `Mutex`/atomic fields record what the code under test did. The
//! [`TypeTree`] builder wires the `System.Object` / `System.ValueType` /
//! `System.Enum` base chain that the type-classification code walks.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    cordebug::handle::NativeHandle,
    cordebug::raw::{
        Hr, ProcessLaunch, RawAppDomain, RawAssembly, RawClass, RawCodeBreakpoint, RawCorDebug,
        RawEval, RawFrame, RawFunction, RawModule, RawProcess, RawResult, RawStepper, RawThread,
        RawType, RawValue,
    },
    cordebug::CorValue,
    metadata::import::MetadataImport,
    metadata::signature::ELEMENT_TYPE,
    metadata::token::Token,
    test::MockMetadata,
};

fn utf16(text: &Option<String>) -> RawResult<Vec<u16>> {
    match text {
        Some(text) => Ok(text.encode_utf16().collect()),
        None => Err(Hr::FAIL),
    }
}

#[derive(Default)]
pub struct MockCorDebug {
    pub processes: Mutex<Vec<NativeHandle<dyn RawProcess>>>,
    pub next_process: AtomicUsize,
    pub launches: Mutex<Vec<ProcessLaunch>>,
    pub attached_pids: Mutex<Vec<u32>>,
    pub terminated: AtomicBool,
    /// Scan results: (pid, executable name, has the runtime loaded)
    pub scan: Vec<(u32, String, bool)>,
    pub fail_create: bool,
}

impl MockCorDebug {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawCorDebug> {
        NativeHandle::new(self.clone() as Arc<dyn RawCorDebug>)
    }

    fn next(&self) -> RawResult<NativeHandle<dyn RawProcess>> {
        let index = self.next_process.fetch_add(1, Ordering::SeqCst);
        self.processes
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .ok_or(Hr::FAIL)
    }
}

impl RawCorDebug for MockCorDebug {
    fn create_process(&self, launch: &ProcessLaunch) -> RawResult<NativeHandle<dyn RawProcess>> {
        if self.fail_create {
            return Err(Hr::FAIL);
        }
        self.launches.lock().unwrap().push(launch.clone());
        self.next()
    }

    fn attach(&self, pid: u32) -> RawResult<NativeHandle<dyn RawProcess>> {
        if self.fail_create {
            return Err(Hr::FAIL);
        }
        self.attached_pids.lock().unwrap().push(pid);
        self.next()
    }

    fn terminate(&self) -> RawResult<()> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn process_ids(&self) -> RawResult<Vec<u32>> {
        Ok(self.scan.iter().map(|entry| entry.0).collect())
    }

    fn process_name(&self, pid: u32) -> RawResult<Vec<u16>> {
        self.scan
            .iter()
            .find(|entry| entry.0 == pid)
            .map(|entry| entry.1.encode_utf16().collect())
            .ok_or(Hr::FAIL)
    }

    fn is_managed(&self, pid: u32) -> RawResult<bool> {
        self.scan
            .iter()
            .find(|entry| entry.0 == pid)
            .map(|entry| entry.2)
            .ok_or(Hr::FAIL)
    }
}

#[derive(Default)]
pub struct MockProcess {
    pub pid: u32,
    pub machine: u16,
    pub threads: Mutex<Vec<NativeHandle<dyn RawThread>>>,
    pub app_domains: Mutex<Vec<NativeHandle<dyn RawAppDomain>>>,
    pub stops: AtomicUsize,
    pub continues: AtomicUsize,
    pub terminated_with: Mutex<Option<u32>>,
    pub detached: AtomicBool,
}

impl MockProcess {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawProcess> {
        NativeHandle::new(self.clone() as Arc<dyn RawProcess>)
    }
}

impl RawProcess for MockProcess {
    fn pid(&self) -> RawResult<u32> {
        Ok(self.pid)
    }

    fn machine(&self) -> RawResult<u16> {
        Ok(self.machine)
    }

    fn stop(&self) -> RawResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn continue_run(&self, _outside_of_controller: bool) -> RawResult<()> {
        self.continues.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn terminate(&self, exit_code: u32) -> RawResult<()> {
        *self.terminated_with.lock().unwrap() = Some(exit_code);
        Ok(())
    }

    fn detach(&self) -> RawResult<()> {
        self.detached.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn threads(&self) -> RawResult<Vec<NativeHandle<dyn RawThread>>> {
        Ok(self.threads.lock().unwrap().clone())
    }

    fn app_domains(&self) -> RawResult<Vec<NativeHandle<dyn RawAppDomain>>> {
        Ok(self.app_domains.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MockAppDomain {
    pub id: u32,
    pub name: Option<String>,
    pub assemblies: Mutex<Vec<NativeHandle<dyn RawAssembly>>>,
}

impl MockAppDomain {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawAppDomain> {
        NativeHandle::new(self.clone() as Arc<dyn RawAppDomain>)
    }
}

impl RawAppDomain for MockAppDomain {
    fn id(&self) -> RawResult<u32> {
        Ok(self.id)
    }

    fn name(&self) -> RawResult<Vec<u16>> {
        utf16(&self.name)
    }

    fn assemblies(&self) -> RawResult<Vec<NativeHandle<dyn RawAssembly>>> {
        Ok(self.assemblies.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MockAssembly {
    pub name: Option<String>,
    pub modules: Mutex<Vec<NativeHandle<dyn RawModule>>>,
    pub app_domain: Mutex<Option<NativeHandle<dyn RawAppDomain>>>,
}

impl MockAssembly {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawAssembly> {
        NativeHandle::new(self.clone() as Arc<dyn RawAssembly>)
    }
}

impl RawAssembly for MockAssembly {
    fn name(&self) -> RawResult<Vec<u16>> {
        utf16(&self.name)
    }

    fn modules(&self) -> RawResult<Vec<NativeHandle<dyn RawModule>>> {
        Ok(self.modules.lock().unwrap().clone())
    }

    fn app_domain(&self) -> RawResult<NativeHandle<dyn RawAppDomain>> {
        self.app_domain.lock().unwrap().clone().ok_or(Hr::FAIL)
    }
}

#[derive(Default)]
pub struct MockModule {
    pub name: Option<String>,
    pub base_address: u64,
    pub size: u32,
    pub token: u32,
    pub is_dynamic: bool,
    pub is_in_memory: bool,
    pub metadata: Arc<MockMetadata>,
    pub assembly: Mutex<Option<NativeHandle<dyn RawAssembly>>>,
    pub classes: Mutex<HashMap<u32, NativeHandle<dyn RawClass>>>,
    pub functions: Mutex<HashMap<u32, NativeHandle<dyn RawFunction>>>,
    pub class_load_callbacks: Mutex<Vec<bool>>,
    pub jit_flags: Mutex<Vec<u32>>,
}

impl MockModule {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawModule> {
        NativeHandle::new(self.clone() as Arc<dyn RawModule>)
    }
}

impl RawModule for MockModule {
    fn name(&self) -> RawResult<Vec<u16>> {
        utf16(&self.name)
    }

    fn base_address(&self) -> RawResult<u64> {
        Ok(self.base_address)
    }

    fn size(&self) -> RawResult<u32> {
        Ok(self.size)
    }

    fn token(&self) -> RawResult<u32> {
        Ok(self.token)
    }

    fn is_dynamic(&self) -> RawResult<bool> {
        Ok(self.is_dynamic)
    }

    fn is_in_memory(&self) -> RawResult<bool> {
        Ok(self.is_in_memory)
    }

    fn assembly(&self) -> RawResult<NativeHandle<dyn RawAssembly>> {
        self.assembly.lock().unwrap().clone().ok_or(Hr::FAIL)
    }

    fn metadata_import(&self) -> RawResult<Arc<dyn MetadataImport>> {
        Ok(self.metadata.clone() as Arc<dyn MetadataImport>)
    }

    fn function_from_token(&self, token: u32) -> RawResult<NativeHandle<dyn RawFunction>> {
        self.functions
            .lock()
            .unwrap()
            .get(&token)
            .cloned()
            .ok_or(Hr::FAIL)
    }

    fn class_from_token(&self, token: u32) -> RawResult<NativeHandle<dyn RawClass>> {
        self.classes
            .lock()
            .unwrap()
            .get(&token)
            .cloned()
            .ok_or(Hr::FAIL)
    }

    fn enable_class_load_callbacks(&self, enable: bool) -> RawResult<()> {
        self.class_load_callbacks.lock().unwrap().push(enable);
        Ok(())
    }

    fn set_jit_compiler_flags(&self, flags: u32) -> RawResult<()> {
        self.jit_flags.lock().unwrap().push(flags);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockClass {
    pub token: u32,
    pub module: Option<NativeHandle<dyn RawModule>>,
    /// Returned by `parameterized_type` regardless of arguments.
    pub instantiation: Mutex<Option<NativeHandle<dyn RawType>>>,
}

impl MockClass {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawClass> {
        NativeHandle::new(self.clone() as Arc<dyn RawClass>)
    }
}

impl RawClass for MockClass {
    fn token(&self) -> RawResult<u32> {
        Ok(self.token)
    }

    fn module(&self) -> RawResult<NativeHandle<dyn RawModule>> {
        self.module.clone().ok_or(Hr::FAIL)
    }

    fn parameterized_type(
        &self,
        _element_type: u8,
        _type_args: &[NativeHandle<dyn RawType>],
    ) -> RawResult<NativeHandle<dyn RawType>> {
        self.instantiation.lock().unwrap().clone().ok_or(Hr::FAIL)
    }
}

#[derive(Default)]
pub struct MockFunction {
    pub token: u32,
    pub module: Option<NativeHandle<dyn RawModule>>,
    pub class: Option<NativeHandle<dyn RawClass>>,
    pub il_breakpoints: Mutex<Vec<(u32, Arc<MockBreakpoint>)>>,
    pub native_breakpoints: Mutex<Vec<(u32, Arc<MockBreakpoint>)>>,
    pub fail_breakpoints: bool,
}

impl MockFunction {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawFunction> {
        NativeHandle::new(self.clone() as Arc<dyn RawFunction>)
    }
}

impl RawFunction for MockFunction {
    fn token(&self) -> RawResult<u32> {
        Ok(self.token)
    }

    fn module(&self) -> RawResult<NativeHandle<dyn RawModule>> {
        self.module.clone().ok_or(Hr::FAIL)
    }

    fn class(&self) -> RawResult<NativeHandle<dyn RawClass>> {
        self.class.clone().ok_or(Hr::FAIL)
    }

    fn create_breakpoint(&self, il_offset: u32) -> RawResult<NativeHandle<dyn RawCodeBreakpoint>> {
        if self.fail_breakpoints {
            return Err(Hr::FAIL);
        }
        let planted = Arc::new(MockBreakpoint::default());
        self.il_breakpoints
            .lock()
            .unwrap()
            .push((il_offset, planted.clone()));
        Ok(NativeHandle::new(planted as Arc<dyn RawCodeBreakpoint>))
    }

    fn create_native_breakpoint(
        &self,
        offset: u32,
    ) -> RawResult<NativeHandle<dyn RawCodeBreakpoint>> {
        if self.fail_breakpoints {
            return Err(Hr::FAIL);
        }
        let planted = Arc::new(MockBreakpoint::default());
        self.native_breakpoints
            .lock()
            .unwrap()
            .push((offset, planted.clone()));
        Ok(NativeHandle::new(planted as Arc<dyn RawCodeBreakpoint>))
    }
}

#[derive(Default)]
pub struct MockType {
    pub element_type: u8,
    pub rank: u32,
    pub class: Option<NativeHandle<dyn RawClass>>,
    pub base: Option<NativeHandle<dyn RawType>>,
    pub type_params: Vec<NativeHandle<dyn RawType>>,
}

impl MockType {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawType> {
        NativeHandle::new(self.clone() as Arc<dyn RawType>)
    }
}

impl RawType for MockType {
    fn element_type(&self) -> RawResult<u8> {
        Ok(self.element_type)
    }

    fn rank(&self) -> RawResult<u32> {
        Ok(self.rank)
    }

    fn first_type_parameter(&self) -> RawResult<NativeHandle<dyn RawType>> {
        self.type_params.first().cloned().ok_or(Hr::FAIL)
    }

    fn type_parameters(&self) -> RawResult<Vec<NativeHandle<dyn RawType>>> {
        Ok(self.type_params.clone())
    }

    fn class(&self) -> RawResult<NativeHandle<dyn RawClass>> {
        self.class.clone().ok_or(Hr::FAIL)
    }

    fn base(&self) -> RawResult<Option<NativeHandle<dyn RawType>>> {
        Ok(self.base.clone())
    }
}

#[derive(Default)]
pub struct MockValue {
    pub element_type: u8,
    pub size: u64,
    pub address: u64,
    pub is_reference: bool,
    pub is_box: bool,
    pub is_string: bool,
    pub is_array: bool,
    pub is_null: bool,
    pub reference_address: u64,
    pub data: Option<Vec<u8>>,
    pub string: Option<String>,
    pub deref: Option<NativeHandle<dyn RawValue>>,
    pub boxed: Option<NativeHandle<dyn RawValue>>,
    pub exact_type: Option<NativeHandle<dyn RawType>>,
    pub fields: HashMap<u32, NativeHandle<dyn RawValue>>,
}

impl MockValue {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawValue> {
        NativeHandle::new(self.clone() as Arc<dyn RawValue>)
    }

    /// A null reference of class type.
    pub fn null_reference() -> Arc<MockValue> {
        Arc::new(MockValue {
            element_type: ELEMENT_TYPE::CLASS,
            is_reference: true,
            is_null: true,
            ..Default::default()
        })
    }

    /// A non-null pointer value targeting `address`.
    pub fn pointer(element_type: u8, address: u64) -> Arc<MockValue> {
        Arc::new(MockValue {
            element_type,
            is_reference: true,
            reference_address: address,
            ..Default::default()
        })
    }

    /// A one-dimensional array value.
    pub fn array() -> Arc<MockValue> {
        Arc::new(MockValue {
            element_type: ELEMENT_TYPE::SZARRAY,
            is_array: true,
            ..Default::default()
        })
    }

    /// A byref slot holding a reference to `target`.
    pub fn byref_to(target: &CorValue) -> Arc<MockValue> {
        Arc::new(MockValue {
            element_type: ELEMENT_TYPE::BYREF,
            is_reference: true,
            deref: Some(target.raw.clone()),
            ..Default::default()
        })
    }
}

impl RawValue for MockValue {
    fn element_type(&self) -> RawResult<u8> {
        Ok(self.element_type)
    }

    fn size(&self) -> RawResult<u64> {
        Ok(self.size)
    }

    fn address(&self) -> RawResult<u64> {
        Ok(self.address)
    }

    fn is_reference(&self) -> bool {
        self.is_reference
    }

    fn is_box(&self) -> bool {
        self.is_box
    }

    fn is_string(&self) -> bool {
        self.is_string
    }

    fn is_array(&self) -> bool {
        self.is_array
    }

    fn is_null(&self) -> RawResult<bool> {
        Ok(self.is_null)
    }

    fn reference_address(&self) -> RawResult<u64> {
        Ok(self.reference_address)
    }

    fn dereference(&self) -> RawResult<NativeHandle<dyn RawValue>> {
        self.deref.clone().ok_or(Hr::FAIL)
    }

    fn boxed_value(&self) -> RawResult<NativeHandle<dyn RawValue>> {
        self.boxed.clone().ok_or(Hr::FAIL)
    }

    fn string_value(&self) -> RawResult<Vec<u16>> {
        utf16(&self.string)
    }

    fn exact_type(&self) -> RawResult<NativeHandle<dyn RawType>> {
        self.exact_type.clone().ok_or(Hr::FAIL)
    }

    fn read_bytes(&self) -> RawResult<Vec<u8>> {
        self.data.clone().ok_or(Hr::FAIL)
    }

    fn field_value(
        &self,
        _class: &NativeHandle<dyn RawClass>,
        field_token: u32,
    ) -> RawResult<NativeHandle<dyn RawValue>> {
        self.fields.get(&field_token).cloned().ok_or(Hr::FAIL)
    }
}

#[derive(Default)]
pub struct MockThread {
    pub id: u32,
    pub user_state: u32,
    pub app_domain: Option<NativeHandle<dyn RawAppDomain>>,
    pub frame: Option<NativeHandle<dyn RawFrame>>,
    pub steppers: Mutex<Vec<Arc<MockStepper>>>,
    pub evals: Mutex<Vec<Arc<MockEval>>>,
}

impl MockThread {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawThread> {
        NativeHandle::new(self.clone() as Arc<dyn RawThread>)
    }
}

impl RawThread for MockThread {
    fn id(&self) -> RawResult<u32> {
        Ok(self.id)
    }

    fn user_state(&self) -> RawResult<u32> {
        Ok(self.user_state)
    }

    fn app_domain(&self) -> RawResult<NativeHandle<dyn RawAppDomain>> {
        self.app_domain.clone().ok_or(Hr::FAIL)
    }

    fn active_frame(&self) -> RawResult<Option<NativeHandle<dyn RawFrame>>> {
        Ok(self.frame.clone())
    }

    fn create_stepper(&self) -> RawResult<NativeHandle<dyn RawStepper>> {
        let stepper = Arc::new(MockStepper::default());
        self.steppers.lock().unwrap().push(stepper.clone());
        Ok(NativeHandle::new(stepper as Arc<dyn RawStepper>))
    }

    fn create_eval(&self) -> RawResult<NativeHandle<dyn RawEval>> {
        let eval = Arc::new(MockEval::default());
        self.evals.lock().unwrap().push(eval.clone());
        Ok(NativeHandle::new(eval as Arc<dyn RawEval>))
    }
}

#[derive(Default)]
pub struct MockFrame {
    pub function_token: u32,
    pub function: Option<NativeHandle<dyn RawFunction>>,
    pub ip: (u32, u32),
    pub locals: Vec<NativeHandle<dyn RawValue>>,
    pub arguments: Vec<NativeHandle<dyn RawValue>>,
}

impl MockFrame {
    pub fn handle(self: &Arc<Self>) -> NativeHandle<dyn RawFrame> {
        NativeHandle::new(self.clone() as Arc<dyn RawFrame>)
    }
}

impl RawFrame for MockFrame {
    fn function_token(&self) -> RawResult<u32> {
        Ok(self.function_token)
    }

    fn function(&self) -> RawResult<NativeHandle<dyn RawFunction>> {
        self.function.clone().ok_or(Hr::FAIL)
    }

    fn ip(&self) -> RawResult<(u32, u32)> {
        Ok(self.ip)
    }

    fn locals(&self) -> RawResult<Vec<NativeHandle<dyn RawValue>>> {
        Ok(self.locals.clone())
    }

    fn arguments(&self) -> RawResult<Vec<NativeHandle<dyn RawValue>>> {
        Ok(self.arguments.clone())
    }
}

#[derive(Default)]
pub struct MockStepper {
    pub active: AtomicBool,
    pub steps: Mutex<Vec<&'static str>>,
}

impl RawStepper for MockStepper {
    fn step(&self, step_into: bool) -> RawResult<()> {
        self.steps
            .lock()
            .unwrap()
            .push(if step_into { "into" } else { "over" });
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn step_out(&self) -> RawResult<()> {
        self.steps.lock().unwrap().push("out");
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> RawResult<bool> {
        Ok(self.active.load(Ordering::SeqCst))
    }

    fn deactivate(&self) -> RawResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockEval {
    pub called: Mutex<Vec<u32>>,
    pub aborted: AtomicBool,
    pub result: Mutex<Option<NativeHandle<dyn RawValue>>>,
}

impl RawEval for MockEval {
    fn call_function(
        &self,
        function: &NativeHandle<dyn RawFunction>,
        _args: &[NativeHandle<dyn RawValue>],
    ) -> RawResult<()> {
        self.called
            .lock()
            .unwrap()
            .push(function.token().unwrap_or(0));
        Ok(())
    }

    fn abort(&self) -> RawResult<()> {
        self.aborted.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn result(&self) -> RawResult<Option<NativeHandle<dyn RawValue>>> {
        Ok(self.result.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MockBreakpoint {
    pub active: AtomicBool,
}

impl RawCodeBreakpoint for MockBreakpoint {
    fn activate(&self, active: bool) -> RawResult<()> {
        self.active.store(active, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> RawResult<bool> {
        Ok(self.active.load(Ordering::SeqCst))
    }
}

pub const OBJECT_TD: Token = Token::new(0x0200_0001);
pub const VALUE_TYPE_TD: Token = Token::new(0x0200_0002);
pub const ENUM_TD: Token = Token::new(0x0200_0003);
pub const DECIMAL_TD: Token = Token::new(0x0200_0004);
pub const DATE_TIME_TD: Token = Token::new(0x0200_0005);
pub const STRING_TD: Token = Token::new(0x0200_0006);
pub const NULLABLE_TD: Token = Token::new(0x0200_0007);
pub const NULLABLE_HAS_VALUE: Token = Token::new(0x0400_0001);
pub const NULLABLE_VALUE: Token = Token::new(0x0400_0002);

/// Metadata with the corlib typedefs the classification code matches
/// by name, including the real `System.Nullable<T>` shape.
pub fn system_metadata() -> MockMetadata {
    let nil = Token::new(0);
    let mut metadata = MockMetadata::new();
    metadata.add_type_def(OBJECT_TD, "System.Object", nil);
    metadata.add_type_def(VALUE_TYPE_TD, "System.ValueType", OBJECT_TD);
    metadata.add_type_def(ENUM_TD, "System.Enum", VALUE_TYPE_TD);
    metadata.add_type_def(DECIMAL_TD, "System.Decimal", VALUE_TYPE_TD);
    metadata.add_type_def(DATE_TIME_TD, "System.DateTime", VALUE_TYPE_TD);
    metadata.add_type_def(STRING_TD, "System.String", OBJECT_TD);
    metadata.add_type_def(NULLABLE_TD, "System.Nullable`1", VALUE_TYPE_TD);
    metadata.add_field(
        NULLABLE_TD,
        NULLABLE_HAS_VALUE,
        "hasValue",
        crate::metadata::import::FieldAttributes::empty(),
        &[0x06, 0x02],
    );
    metadata.add_field(
        NULLABLE_TD,
        NULLABLE_VALUE,
        "value",
        crate::metadata::import::FieldAttributes::empty(),
        &[0x06, 0x13, 0x00],
    );
    metadata.generic_counts.insert(NULLABLE_TD, 1);
    metadata
}

/// A module plus the instantiated `System.Object` → `System.ValueType`
/// → `System.Enum` chain; [`TypeTree::class_type`] hangs further types
/// off it.
pub struct TypeTree {
    pub module: Arc<MockModule>,
    pub object: NativeHandle<dyn RawType>,
    pub value_type: NativeHandle<dyn RawType>,
    pub enum_type: NativeHandle<dyn RawType>,
}

impl TypeTree {
    pub fn new(metadata: MockMetadata) -> TypeTree {
        let module = Arc::new(MockModule {
            name: Some("C:\\w\\mscorlib.dll".into()),
            metadata: Arc::new(metadata),
            ..Default::default()
        });
        let object = Self::build(&module, ELEMENT_TYPE::CLASS, OBJECT_TD, None, Vec::new());
        let value_type = Self::build(
            &module,
            ELEMENT_TYPE::CLASS,
            VALUE_TYPE_TD,
            Some(&object),
            Vec::new(),
        );
        let enum_type = Self::build(
            &module,
            ELEMENT_TYPE::CLASS,
            ENUM_TD,
            Some(&value_type),
            Vec::new(),
        );

        TypeTree {
            module,
            object,
            value_type,
            enum_type,
        }
    }

    /// An instantiated type backed by a class in this module.
    pub fn class_type(
        &self,
        element_type: u8,
        token: Token,
        base: Option<&NativeHandle<dyn RawType>>,
    ) -> NativeHandle<dyn RawType> {
        Self::build(&self.module, element_type, token, base, Vec::new())
    }

    /// Same as [`TypeTree::class_type`] with generic arguments.
    pub fn generic_type(
        &self,
        element_type: u8,
        token: Token,
        base: Option<&NativeHandle<dyn RawType>>,
        type_params: Vec<NativeHandle<dyn RawType>>,
    ) -> NativeHandle<dyn RawType> {
        Self::build(&self.module, element_type, token, base, type_params)
    }

    fn build(
        module: &Arc<MockModule>,
        element_type: u8,
        token: Token,
        base: Option<&NativeHandle<dyn RawType>>,
        type_params: Vec<NativeHandle<dyn RawType>>,
    ) -> NativeHandle<dyn RawType> {
        let class = Arc::new(MockClass {
            token: token.value(),
            module: Some(module.handle()),
            ..Default::default()
        });
        module
            .classes
            .lock()
            .unwrap()
            .insert(token.value(), class.handle());

        let built = Arc::new(MockType {
            element_type,
            class: Some(class.handle()),
            base: base.cloned(),
            type_params,
            ..Default::default()
        });
        built.handle()
    }
}

/// A bare primitive type with no class behind it.
pub fn primitive_type(element_type: u8) -> NativeHandle<dyn RawType> {
    Arc::new(MockType {
        element_type,
        ..Default::default()
    })
    .handle()
}

/// A primitive value carrying `data` under `element_type`.
pub fn prim_value(element_type: u8, data: &[u8]) -> CorValue {
    let value = Arc::new(MockValue {
        element_type,
        size: data.len() as u64,
        data: Some(data.to_vec()),
        exact_type: Some(primitive_type(element_type)),
        ..Default::default()
    });
    CorValue::new(value.handle())
}

/// A one-byte `u8` value.
pub fn byte_value(byte: u8) -> CorValue {
    prim_value(ELEMENT_TYPE::U1, &[byte])
}

/// A non-null object reference to `target`.
pub fn reference_to(target: &CorValue) -> CorValue {
    let value = Arc::new(MockValue {
        element_type: ELEMENT_TYPE::CLASS,
        is_reference: true,
        reference_address: 0x1000,
        deref: Some(target.raw.clone()),
        ..Default::default()
    });
    CorValue::new(value.handle())
}

/// A box holding `inner`.
pub fn boxed(inner: &CorValue) -> CorValue {
    let value = Arc::new(MockValue {
        element_type: ELEMENT_TYPE::CLASS,
        is_box: true,
        boxed: Some(inner.raw.clone()),
        ..Default::default()
    });
    CorValue::new(value.handle())
}

/// A string value holding `text`.
pub fn string_value(text: &str) -> CorValue {
    let value = Arc::new(MockValue {
        element_type: ELEMENT_TYPE::STRING,
        is_string: true,
        string: Some(text.to_string()),
        ..Default::default()
    });
    CorValue::new(value.handle())
}

/// A value-type value of `exact_type` carrying `data`.
pub fn value_of_type(exact_type: &NativeHandle<dyn RawType>, data: &[u8]) -> CorValue {
    let value = Arc::new(MockValue {
        element_type: ELEMENT_TYPE::VALUETYPE,
        size: data.len() as u64,
        data: Some(data.to_vec()),
        exact_type: Some(exact_type.clone()),
        ..Default::default()
    });
    CorValue::new(value.handle())
}

/// The instantiated `System.Decimal` type.
pub fn system_decimal() -> NativeHandle<dyn RawType> {
    let tree = TypeTree::new(system_metadata());
    tree.class_type(ELEMENT_TYPE::VALUETYPE, DECIMAL_TD, Some(&tree.value_type))
}

/// An enum type named `name` whose `value__` field has the given
/// underlying element type.
pub fn system_enum_type(name: &str, underlying: u8) -> NativeHandle<dyn RawType> {
    let enum_td = Token::new(0x0200_0010);
    let value_field = Token::new(0x0400_0010);

    let mut metadata = system_metadata();
    metadata.add_type_def(enum_td, name, ENUM_TD);
    metadata.add_field(
        enum_td,
        value_field,
        "value__",
        crate::metadata::import::FieldAttributes::SPECIAL_NAME,
        &[0x06, underlying],
    );

    let tree = TypeTree::new(metadata);
    tree.class_type(ELEMENT_TYPE::VALUETYPE, enum_td, Some(&tree.enum_type))
}

/// A `System.Nullable<i32>` type with the real corlib field layout.
pub fn nullable_type() -> NativeHandle<dyn RawType> {
    let tree = TypeTree::new(system_metadata());
    tree.generic_type(
        ELEMENT_TYPE::VALUETYPE,
        NULLABLE_TD,
        Some(&tree.value_type),
        vec![primitive_type(ELEMENT_TYPE::I4)],
    )
}

/// A nullable value: `has_value` scripts the `hasValue` field, `inner`
/// the `value` field.
pub fn nullable_value(
    exact_type: &NativeHandle<dyn RawType>,
    has_value: bool,
    inner: Option<&CorValue>,
) -> CorValue {
    let flag = Arc::new(MockValue {
        element_type: ELEMENT_TYPE::BOOLEAN,
        size: 1,
        data: Some(vec![u8::from(has_value)]),
        exact_type: Some(primitive_type(ELEMENT_TYPE::BOOLEAN)),
        ..Default::default()
    });

    let mut fields = HashMap::new();
    fields.insert(NULLABLE_HAS_VALUE.value(), flag.handle());
    if let Some(inner) = inner {
        fields.insert(NULLABLE_VALUE.value(), inner.raw.clone());
    }

    let value = Arc::new(MockValue {
        element_type: ELEMENT_TYPE::VALUETYPE,
        size: 8,
        exact_type: Some(exact_type.clone()),
        fields,
        ..Default::default()
    });
    CorValue::new(value.handle())
}
