//! The mutable generation context, threaded explicitly through every
//! emitter. Function entry saves a frame; exit restores it even when
//! emission fails mid-body.

use std::collections::{BTreeMap, BTreeSet};

use crate::include::IncludeSet;
use crate::ty::{ParameterInfo, TypeInfo};

#[derive(Debug, Default)]
pub struct GenState {
    /// Currently visible variables: globals stay, locals leave with the
    /// enclosing function frame.
    pub type_registry: BTreeMap<String, TypeInfo>,
    pub current_parameters: BTreeMap<String, ParameterInfo>,
    pub current_scope: Option<String>,
    pub current_function: Option<String>,
    pub current_return_type: Option<TypeInfo>,
    pub in_function_body: bool,
    pub local_variables: BTreeSet<String>,
    pub local_arrays: BTreeSet<String>,
    /// Shadow integers declared for float bit access in this function.
    pub float_shadows: BTreeSet<String>,
    /// Shadows whose value currently mirrors the float's bit pattern.
    pub float_shadow_current: BTreeSet<String>,
    /// Declarations/statements flushed before the current statement.
    pub pending_lines: Vec<String>,
    /// Per-field initializers for aggregate-init-incompatible C++
    /// classes, flushed at the next statement boundary.
    pub pending_cpp_assignments: Vec<String>,
    pub last_array_init_count: Option<usize>,
    pub last_array_fill: Option<String>,
    /// Target type of the expression currently being generated.
    pub expected_type: Option<TypeInfo>,
    pub temp_counter: u32,
    pub includes: IncludeSet,
    /// Function name -> parameters it (transitively) modifies.
    pub modified_params: BTreeMap<String, BTreeSet<String>>,
    /// Function name -> parameters received by value.
    pub pass_by_value: BTreeMap<String, BTreeSet<String>>,
}

/// Saved state restored when a function body is done (or abandoned on
/// error).
#[derive(Debug)]
pub struct FunctionFrame {
    parameters: BTreeMap<String, ParameterInfo>,
    function: Option<String>,
    return_type: Option<TypeInfo>,
    in_body: bool,
    locals: BTreeSet<String>,
    local_arrays: BTreeSet<String>,
    shadows: BTreeSet<String>,
    shadows_current: BTreeSet<String>,
}

impl GenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_temp(&mut self) -> String {
        let name = format!("_cnx_tmp_{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeInfo> {
        self.type_registry.get(name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.current_parameters.get(name)
    }

    pub fn register_variable(&mut self, name: &str, info: TypeInfo) {
        if self.in_function_body {
            self.local_variables.insert(name.to_owned());
            if info.is_array {
                self.local_arrays.insert(name.to_owned());
            }
        }
        self.type_registry.insert(name.to_owned(), info);
    }

    /// Swap in a new expected type, returning the previous one so the
    /// caller can restore it on every exit path.
    pub fn swap_expected(
        &mut self,
        expected: Option<TypeInfo>,
    ) -> Option<TypeInfo> {
        std::mem::replace(&mut self.expected_type, expected)
    }

    pub fn enter_function(
        &mut self,
        name: &str,
        parameters: BTreeMap<String, ParameterInfo>,
        return_type: Option<TypeInfo>,
    ) -> FunctionFrame {
        let frame = FunctionFrame {
            parameters: std::mem::take(&mut self.current_parameters),
            function: self.current_function.take(),
            return_type: self.current_return_type.take(),
            in_body: self.in_function_body,
            locals: std::mem::take(&mut self.local_variables),
            local_arrays: std::mem::take(&mut self.local_arrays),
            shadows: std::mem::take(&mut self.float_shadows),
            shadows_current: std::mem::take(&mut self.float_shadow_current),
        };
        self.current_parameters = parameters;
        self.current_function = Some(name.to_owned());
        self.current_return_type = return_type;
        self.in_function_body = true;
        frame
    }

    /// Tear the function frame down; local registry entries leave with
    /// it.
    pub fn exit_function(&mut self, frame: FunctionFrame) {
        for local in &self.local_variables {
            self.type_registry.remove(local);
        }
        self.current_parameters = frame.parameters;
        self.current_function = frame.function;
        self.current_return_type = frame.return_type;
        self.in_function_body = frame.in_body;
        self.local_variables = frame.locals;
        self.local_arrays = frame.local_arrays;
        self.float_shadows = frame.shadows;
        self.float_shadow_current = frame.shadows_current;
    }

    pub fn enter_scope(&mut self, name: &str) -> Option<String> {
        std::mem::replace(&mut self.current_scope, Some(name.to_owned()))
    }

    pub fn exit_scope(&mut self, previous: Option<String>) {
        self.current_scope = previous;
    }

    /// Whether `param` of `function` is (transitively) modified.
    pub fn param_modified(&self, function: &str, param: &str) -> bool {
        self.modified_params
            .get(function)
            .is_some_and(|set| set.contains(param))
    }

    pub fn param_by_value(&self, function: &str, param: &str) -> bool {
        self.pass_by_value
            .get(function)
            .is_some_and(|set| set.contains(param))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{BaseType, TypeInfo};

    #[test]
    fn function_frame_restores_registry() {
        let mut state = GenState::new();
        state.register_variable("g", TypeInfo::of(BaseType::U32));

        let frame =
            state.enter_function("f", BTreeMap::new(), None);
        state.register_variable("x", TypeInfo::of(BaseType::U8));
        assert!(state.lookup("x").is_some());
        state.exit_function(frame);

        assert!(state.lookup("x").is_none());
        assert!(state.lookup("g").is_some());
        assert!(!state.in_function_body);
    }

    #[test]
    fn temp_names_are_monotonic() {
        let mut state = GenState::new();
        assert_eq!(state.next_temp(), "_cnx_tmp_0");
        assert_eq!(state.next_temp(), "_cnx_tmp_1");
    }
}
