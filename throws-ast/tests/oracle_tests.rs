//! Subtype oracle and element graph behavior over built programs.

use throws_ast::{ExecutableKind, Program, VariableKind};

#[test]
fn assignability_flows_through_mixins() {
    let mut program = Program::new();
    let lib = program.add_library("package:demo/demo.dart");

    let logging = program.add_class(lib, "Logging");
    let logging_ty = program.types.interface(logging, Vec::new());
    let service = program.add_class(lib, "Service");
    program.add_mixin(service, logging_ty);
    let service_ty = program.types.interface(service, Vec::new());

    assert!(program.is_assignable_to(service_ty, logging_ty));
    assert!(!program.is_assignable_to(logging_ty, service_ty));
}

#[test]
fn assignability_walks_deep_chains() {
    let mut program = Program::new();
    let core = *program.core();
    let lib = program.add_library("package:demo/demo.dart");

    // HttpException implements IOException implements Exception.
    let io = program.add_class(lib, "IOException");
    program.add_interface(io, core.exception);
    let io_ty = program.types.interface(io, Vec::new());
    let http = program.add_class(lib, "HttpException");
    program.add_interface(http, io_ty);
    let http_ty = program.types.interface(http, Vec::new());

    assert!(program.is_assignable_to(http_ty, core.exception));
    assert!(program.is_exception_subtype(http_ty));
    assert!(!program.is_exception_subtype(core.state_error));
}

#[test]
fn function_types_are_covariant_in_return_and_fit_function() {
    let mut program = Program::new();
    let core = *program.core();

    let returns_fmt = program.types.function(core.format_exception);
    let returns_exc = program.types.function(core.exception);
    assert!(program.is_assignable_to(returns_fmt, returns_exc));
    assert!(!program.is_assignable_to(returns_exc, returns_fmt));

    let function_class_ty = program.types.interface(program.core().function_class, Vec::new());
    assert!(program.is_assignable_to(returns_exc, function_class_ty));
    assert!(program.is_assignable_to(returns_exc, core.object));
}

#[test]
fn supertype_classes_include_on_constraints() {
    let mut program = Program::new();
    let lib = program.add_library("package:demo/demo.dart");

    let base = program.add_class(lib, "Base");
    let base_ty = program.types.interface(base, Vec::new());
    let mixin = program.add_class(lib, "Auditing");
    program.add_on_constraint(mixin, base_ty);

    assert_eq!(program.supertype_classes(mixin), vec![base]);
}

#[test]
fn element_locations_render_members_and_parameters() {
    let mut program = Program::new();
    let lib = program.add_library("package:demo/demo.dart");
    let void_ty = program.types.void_type();

    let class = program.add_class(lib, "Outer");
    let ctor = program.add_default_constructor(class);
    let method = program.add_executable(class, "run", ExecutableKind::Method, void_ty);
    let param = program.add_parameter(method, "callback", None);

    assert_eq!(
        program.elements.location_of(ctor).to_string(),
        "package:demo/demo.dart::Outer.new"
    );
    assert_eq!(
        program.elements.location_of(param).to_string(),
        "package:demo/demo.dart::Outer.run.$0"
    );
}

#[test]
fn owners_resolve_through_nested_nodes() {
    let mut program = Program::new();
    let lib = program.add_library("package:demo/demo.dart");
    let void_ty = program.types.void_type();
    let f = program.add_executable(lib, "f", ExecutableKind::Function, void_ty);

    let span = throws_ast::Span::synthetic();
    let lit = program.expr(throws_ast::ExprKind::Literal(throws_ast::LiteralValue::Null), span);
    let stmt = program.expr_stmt(lit);
    let body = program.block(vec![stmt], span);
    program.set_body(f, body);

    assert_eq!(program.owner_of(lit), Some(f));
    assert_eq!(program.body_root_owner(body), Some(f));
    assert_eq!(program.body_root_owner(lit), None);
}

#[test]
fn generic_instantiations_compare_argument_wise() {
    let mut program = Program::new();
    let core = *program.core();
    let lib = program.add_library("package:demo/demo.dart");

    // Box<T>, Chest<T> extends Box<T>.
    let box_class = program.add_class_with_params(lib, "Box", &["T"]);
    let t_param = program.types.type_parameter(throws_ast::Symbol::intern("T"));
    let chest = program.add_class_with_params(lib, "Chest", &["T"]);
    let box_of_t = program.types.interface(box_class, vec![t_param]);
    program.set_superclass(chest, box_of_t);

    let chest_of_fmt = program.types.interface(chest, vec![core.format_exception]);
    let box_of_exc = program.types.interface(box_class, vec![core.exception]);
    let box_of_state = program.types.interface(box_class, vec![core.state_error]);

    assert!(program.is_assignable_to(chest_of_fmt, box_of_exc));
    assert!(!program.is_assignable_to(chest_of_fmt, box_of_state));
}

#[test]
fn fields_register_as_class_members() {
    let mut program = Program::new();
    let lib = program.add_library("package:demo/demo.dart");
    let class = program.add_class(lib, "Holder");
    let field = program.add_variable(class, "value", VariableKind::Field, None);

    let members = &program.elements.get(class).as_class().unwrap().members;
    assert!(members.contains(&field));
}
