use rstest::rstest;

use crate::assign::{classify, AssignmentKind};
use crate::ast::{
    AssignOp, AssignStmt, BinaryOp, CallExpr, Expr, Function, Item, Param,
    Pos, PostfixChain, Prefix, Segment, Stmt, StructDecl, StructField,
    SubscriptGroup, SwitchCase, SwitchStmt, TypeExpr, Unit, VarDecl,
};
use crate::error::{kind_of, ErrorKind};
use crate::gen::{generate, Options};
use crate::state::GenState;
use crate::symbol::{
    BitmapDef, BitmapField, CallbackSignature, FunctionSig, RegisterAccess,
    RegisterMember, SigParam, SourceLanguage, StructDef, StructFieldDef,
    SymbolTable, Visibility,
};
use crate::ty::{BaseType, OverflowBehavior, TypeInfo};

fn p() -> Pos {
    Pos::default()
}

fn int(text: &str) -> Expr {
    Expr::int(text, p())
}

fn ident(name: &str) -> Expr {
    Expr::ident(name, p())
}

fn chain(names: &[&str]) -> PostfixChain {
    PostfixChain {
        prefix: Prefix::None,
        segments: names.iter().map(|n| Segment::plain(n)).collect(),
        pos: p(),
    }
}

fn subscripted(name: &str, exprs: Vec<Expr>) -> PostfixChain {
    let mut segment = Segment::plain(name);
    segment.subscripts.push(SubscriptGroup { exprs });
    PostfixChain {
        prefix: Prefix::None,
        segments: vec![segment],
        pos: p(),
    }
}

fn assign(target: PostfixChain, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt {
        target,
        op: AssignOp::Set,
        value,
        pos: p(),
    })
}

fn compound(target: PostfixChain, op: AssignOp, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt {
        target,
        op,
        value,
        pos: p(),
    })
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        pos: p(),
    }
}

fn string_ty(capacity: u32) -> TypeExpr {
    let mut ty = TypeExpr::named("string");
    ty.string_capacity = Some(capacity);
    ty
}

fn array_ty(base: &str, len: u32) -> TypeExpr {
    let mut ty = TypeExpr::named(base);
    ty.array_dims = vec![Some(int(&len.to_string()))];
    ty
}

fn var(name: &str, ty: TypeExpr, init: Option<Expr>) -> Stmt {
    Stmt::VarDecl(VarDecl {
        name: name.to_owned(),
        ty,
        init,
        c_style_dims: false,
        pos: p(),
    })
}

fn call(name: &str, args: Vec<Expr>) -> Stmt {
    Stmt::Call(CallExpr {
        callee: PostfixChain::ident(name, p()),
        args,
        pos: p(),
    })
}

fn func(name: &str, params: &[(&str, &str)], body: Vec<Stmt>) -> Item {
    Item::Function(Function {
        name: name.to_owned(),
        params: params
            .iter()
            .map(|(n, t)| Param {
                name: (*n).to_owned(),
                ty: TypeExpr::named(t),
                pos: p(),
            })
            .collect(),
        ret: None,
        body,
        pos: p(),
    })
}

fn register_fn(symbols: &mut SymbolTable, name: &str, params: &[(&str, &str)]) {
    let params = params
        .iter()
        .map(|(n, t)| SigParam {
            name: (*n).to_owned(),
            ty: TypeInfo::of(BaseType::from_name(t)),
            force_pointer: false,
        })
        .collect();
    symbols.add_function(
        name,
        FunctionSig {
            return_type: None,
            params,
            callback_type: None,
            language: SourceLanguage::CNext,
            scope: None,
        },
    );
}

/// A single parameterless function `f` wrapping the given body.
fn unit_fn(body: Vec<Stmt>) -> (Unit, SymbolTable) {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    (
        Unit {
            items: vec![func("f", &[], body)],
        },
        symbols,
    )
}

fn gen_c(unit: &Unit, symbols: &SymbolTable) -> String {
    generate(unit, symbols, Options::default())
        .expect("generation succeeds")
        .source
}

fn gen_cpp(unit: &Unit, symbols: &SymbolTable) -> String {
    generate(unit, symbols, Options { cpp_mode: true })
        .expect("generation succeeds")
        .source
}

fn gen_kind(unit: &Unit, symbols: &SymbolTable) -> ErrorKind {
    let err = generate(unit, symbols, Options::default())
        .expect_err("generation fails");
    kind_of(&err).expect("taxonomy error")
}

fn status_flags_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_bitmap(
        "StatusFlags",
        BitmapDef {
            bit_width: 8,
            fields: vec![
                BitmapField {
                    name: "Ready".to_owned(),
                    offset: 0,
                    width: 1,
                },
                BitmapField {
                    name: "Mode".to_owned(),
                    offset: 4,
                    width: 4,
                },
            ],
        },
    );
    symbols
}

// ---------------------------------------------------------------------
// end-to-end scenarios

#[test]
fn s1_integer_bit_range_write() {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u8"), Some(int("0"))),
        assign(subscripted("x", vec![int("0"), int("3")]), int("5")),
    ]);
    insta::assert_snapshot!(gen_c(&unit, &symbols), @r#"
    #include <stdint.h>

    void f(void);

    void f(void) {
        uint8_t x = 0U;
        x = (uint8_t)((x & ~(7U << 0)) | (((uint8_t)5 & 7U) << 0));
    }
    "#);
}

#[test]
fn s2_bitmap_field_write() {
    let symbols = status_flags_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("flags", TypeExpr::named("StatusFlags"), None),
                assign(chain(&["flags", "Mode"]), int("3")),
            ],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains(
        "flags = (uint8_t)((flags & ~(15U << 4)) | (((uint8_t)3 & 15U) << 4));"
    ));
}

#[test]
fn s3_float_bit_read_through_shadow() {
    let (unit, symbols) = unit_fn(vec![
        var("v", TypeExpr::named("f32"), None),
        var(
            "m",
            TypeExpr::named("u32"),
            Some(Expr::Path(subscripted("v", vec![int("23"), int("8")]))),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("uint32_t __bits_v;"));
    assert!(source.contains("memcpy(&__bits_v, &v, sizeof(v));"));
    assert!(source.contains("uint32_t m = ((__bits_v >> 23) & 255U);"));
    assert!(source.contains("#include <string.h>"));
    assert!(source.contains("_Static_assert(sizeof(float) == 4U"));
}

#[test]
fn s4_string_concat_in_function() {
    let (unit, symbols) = unit_fn(vec![
        var("d", string_ty(8), None),
        assign(
            chain(&["d"]),
            binary(
                BinaryOp::Add,
                Expr::StringLit {
                    value: "hi".to_owned(),
                    pos: p(),
                },
                Expr::StringLit {
                    value: " there".to_owned(),
                    pos: p(),
                },
            ),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("char d[9] = \"\";"));
    assert!(source.contains("strncpy(d, \"hi\", 8);"));
    assert!(source.contains("strncat(d, \" there\", 8 - strlen(d));"));
    assert!(source.contains("d[8] = '\\0';"));
}

#[test]
fn s4_string_concat_rejected_at_global_scope() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    let unit = Unit {
        items: vec![Item::VarDecl(VarDecl {
            name: "d".to_owned(),
            ty: string_ty(8),
            init: Some(binary(
                BinaryOp::Add,
                Expr::StringLit {
                    value: "hi".to_owned(),
                    pos: p(),
                },
                Expr::StringLit {
                    value: " there".to_owned(),
                    pos: p(),
                },
            )),
            c_style_dims: false,
            pos: p(),
        })],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::StringConcatAtGlobalScope);
}

#[test]
fn s5_pass_by_reference_call() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "inc", &[("n", "u32")]);
    register_fn(&mut symbols, "caller", &[]);
    let unit = Unit {
        items: vec![
            func(
                "inc",
                &[("n", "u32")],
                vec![compound(
                    chain(&["n"]),
                    AssignOp::Set,
                    binary(BinaryOp::Add, ident("n"), int("1")),
                )],
            ),
            func(
                "caller",
                &[],
                vec![
                    var("x", TypeExpr::named("u32"), Some(int("0"))),
                    call("inc", vec![ident("x")]),
                ],
            ),
        ],
    };
    insta::assert_snapshot!(gen_c(&unit, &symbols), @r#"
    #include <stdint.h>

    void inc(uint32_t* n);
    void caller(void);

    void inc(uint32_t* n) {
        (*n) = (*n) + 1U;
    }

    void caller(void) {
        uint32_t x = 0U;
        inc(&x);
    }
    "#);
}

#[test]
fn s5_pass_by_reference_call_cpp() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "inc", &[("n", "u32")]);
    register_fn(&mut symbols, "caller", &[]);
    let unit = Unit {
        items: vec![
            func(
                "inc",
                &[("n", "u32")],
                vec![assign(
                    chain(&["n"]),
                    binary(BinaryOp::Add, ident("n"), int("1")),
                )],
            ),
            func(
                "caller",
                &[],
                vec![
                    var("x", TypeExpr::named("u32"), Some(int("0"))),
                    call("inc", vec![ident("x")]),
                ],
            ),
        ],
    };
    let source = gen_cpp(&unit, &symbols);
    assert!(source.contains("void inc(uint32_t& n)"));
    assert!(source.contains("n = n + 1U;"));
    assert!(source.contains("inc(x);"));
}

/// `Point` as a declared type plus a function mutating it through a
/// struct parameter, and a caller handing a struct variable in.
fn struct_parameter_unit() -> (Unit, SymbolTable) {
    let mut symbols = SymbolTable::new();
    symbols.add_struct(
        "Point",
        StructDef {
            fields: vec![StructFieldDef {
                name: "x".to_owned(),
                ty: TypeInfo::of(BaseType::U32),
            }],
            language: SourceLanguage::CNext,
        },
    );
    register_fn(&mut symbols, "move_to", &[("p", "Point"), ("v", "u32")]);
    register_fn(&mut symbols, "caller", &[]);
    let unit = Unit {
        items: vec![
            Item::StructDecl(StructDecl {
                name: "Point".to_owned(),
                fields: vec![StructField {
                    name: "x".to_owned(),
                    ty: TypeExpr::named("u32"),
                    pos: p(),
                }],
                pos: p(),
            }),
            func(
                "move_to",
                &[("p", "Point"), ("v", "u32")],
                vec![
                    assign(chain(&["p", "x"]), ident("v")),
                    var(
                        "r",
                        TypeExpr::named("u32"),
                        Some(Expr::Path(chain(&["p", "x"]))),
                    ),
                ],
            ),
            func(
                "caller",
                &[],
                vec![
                    var("s", TypeExpr::named("Point"), None),
                    call("move_to", vec![ident("s"), int("5")]),
                ],
            ),
        ],
    };
    (unit, symbols)
}

#[test]
fn struct_parameter_passes_by_reference() {
    let (unit, symbols) = struct_parameter_unit();
    insta::assert_snapshot!(gen_c(&unit, &symbols), @r#"
    #include <stdint.h>

    typedef struct {
        uint32_t x;
    } Point;

    void move_to(Point* p, const uint32_t v);
    void caller(void);

    void move_to(Point* p, const uint32_t v) {
        p->x = v;
        uint32_t r = p->x;
    }

    void caller(void) {
        Point s = {0};
        move_to(&s, 5U);
    }
    "#);
}

#[test]
fn struct_parameter_passes_by_reference_cpp() {
    let (unit, symbols) = struct_parameter_unit();
    insta::assert_snapshot!(gen_cpp(&unit, &symbols), @r#"
    #include <cstdint>

    typedef struct {
        uint32_t x;
    } Point;

    void move_to(Point& p, const uint32_t v);
    void caller();

    void move_to(Point& p, const uint32_t v) {
        p.x = v;
        uint32_t r = p.x;
    }

    void caller() {
        Point s = {0};
        move_to(s, 5U);
    }
    "#);
}

#[test]
fn s6_non_exhaustive_enum_switch() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_enum("Color", &["Red", "Green", "Blue"]);
    let case = |label: &str| SwitchCase {
        labels: vec![ident(label)],
        body: vec![],
        pos: p(),
    };
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("c", TypeExpr::named("Color"), None),
                Stmt::Switch(SwitchStmt {
                    selector: ident("c"),
                    cases: vec![case("Red"), case("Green")],
                    default_covers: None,
                    default_body: None,
                    pos: p(),
                }),
            ],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::NonExhaustiveSwitch);
}

#[test]
fn exhaustive_enum_switch_emits_prefixed_labels() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_enum("Color", &["Red", "Green"]);
    let case = |label: &str| SwitchCase {
        labels: vec![ident(label)],
        body: vec![],
        pos: p(),
    };
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("c", TypeExpr::named("Color"), None),
                Stmt::Switch(SwitchStmt {
                    selector: ident("c"),
                    cases: vec![case("Red"), case("Green")],
                    default_covers: None,
                    default_body: None,
                    pos: p(),
                }),
            ],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("switch (c) {"));
    assert!(source.contains("case Color_Red:"));
    assert!(source.contains("case Color_Green:"));
    assert!(source.contains("Color c = Color_Red;"));
}

// ---------------------------------------------------------------------
// classifier properties

fn bitmap_state() -> (SymbolTable, GenState) {
    let symbols = status_flags_symbols();
    let mut state = GenState::new();
    let mut info = TypeInfo::of(BaseType::Named("StatusFlags".to_owned()));
    info.is_bitmap = true;
    info.bitmap_type = Some("StatusFlags".to_owned());
    info.bit_width = 8;
    state.register_variable("flags", info);
    state.register_variable("x", TypeInfo::of(BaseType::U8));
    state.register_variable("v", TypeInfo::of(BaseType::F32));
    (symbols, state)
}

#[rstest]
#[case("Ready", AssignmentKind::BitmapFieldSingleBit)]
#[case("Mode", AssignmentKind::BitmapFieldMultiBit)]
fn bitmap_field_width_drives_classification(
    #[case] field: &str,
    #[case] expect: AssignmentKind,
) {
    let (symbols, state) = bitmap_state();
    let stmt = AssignStmt {
        target: chain(&["flags", field]),
        op: AssignOp::Set,
        value: int("1"),
        pos: p(),
    };
    assert_eq!(classify(&symbols, &state, &stmt), expect);
}

#[rstest]
#[case(1, AssignmentKind::IntegerBit)]
#[case(2, AssignmentKind::IntegerBitRange)]
fn subscript_count_drives_bit_classification(
    #[case] exprs: usize,
    #[case] expect: AssignmentKind,
) {
    let (symbols, state) = bitmap_state();
    let subscript = (0..exprs).map(|i| int(&i.to_string())).collect();
    let stmt = AssignStmt {
        target: subscripted("x", subscript),
        op: AssignOp::Set,
        value: int("1"),
        pos: p(),
    };
    assert_eq!(classify(&symbols, &state, &stmt), expect);
}

#[rstest]
#[case(1, AssignmentKind::FloatBit)]
#[case(2, AssignmentKind::FloatBitRange)]
fn float_targets_classify_to_shadow_writes(
    #[case] exprs: usize,
    #[case] expect: AssignmentKind,
) {
    let (symbols, state) = bitmap_state();
    let subscript = (0..exprs).map(|i| int(&i.to_string())).collect();
    let stmt = AssignStmt {
        target: subscripted("v", subscript),
        op: AssignOp::Set,
        value: int("1"),
        pos: p(),
    };
    assert_eq!(classify(&symbols, &state, &stmt), expect);
}

// ---------------------------------------------------------------------
// const inference and pass-by-value

#[test]
fn unmodified_parameter_is_const_by_value() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "reader", &[("a", "u32")]);
    let unit = Unit {
        items: vec![func(
            "reader",
            &[("a", "u32")],
            vec![var("b", TypeExpr::named("u32"), Some(ident("a")))],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("void reader(const uint32_t a)"));
    assert!(source.contains("uint32_t b = a;"));
}

#[test]
fn transitive_modification_removes_const() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "sink", &[("x", "u32")]);
    register_fn(&mut symbols, "mid", &[("y", "u32")]);
    register_fn(&mut symbols, "top", &[("z", "u32")]);
    let unit = Unit {
        items: vec![
            func("sink", &[("x", "u32")], vec![assign(chain(&["x"]), int("1"))]),
            func("mid", &[("y", "u32")], vec![call("sink", vec![ident("y")])]),
            func("top", &[("z", "u32")], vec![call("mid", vec![ident("z")])]),
        ],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("void sink(uint32_t* x)"));
    assert!(source.contains("void mid(uint32_t* y)"));
    assert!(source.contains("void top(uint32_t* z)"));
    assert!(source.contains("sink(y);"));
}

// ---------------------------------------------------------------------
// bit round-trip and shadow invalidation

#[test]
fn single_bit_write_and_read_round_trip() {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u8"), Some(int("0"))),
        assign(subscripted("x", vec![int("5")]), int("1")),
        var(
            "r",
            TypeExpr::named("u8"),
            Some(Expr::Path(subscripted("x", vec![int("5")]))),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains(
        "x = (uint8_t)((x & ~(1U << 5)) | (((uint8_t)1 & 1U) << 5));"
    ));
    assert!(source.contains("uint8_t r = ((x >> 5) & 1U);"));
}

#[test]
fn direct_store_invalidates_float_shadow() {
    let (unit, symbols) = unit_fn(vec![
        var("v", TypeExpr::named("f32"), None),
        assign(subscripted("v", vec![int("0")]), int("1")),
        assign(
            chain(&["v"]),
            Expr::FloatLit {
                text: "2.5".to_owned(),
                pos: p(),
            },
        ),
        assign(subscripted("v", vec![int("1")]), int("1")),
    ]);
    let source = gen_c(&unit, &symbols);
    let reloads = source.matches("memcpy(&__bits_v, &v, sizeof(v));").count();
    assert_eq!(reloads, 2);
    assert!(source.contains("v = 2.5f;"));
}

#[test]
fn consecutive_bit_writes_reuse_the_shadow() {
    let (unit, symbols) = unit_fn(vec![
        var("v", TypeExpr::named("f32"), None),
        assign(subscripted("v", vec![int("0")]), int("1")),
        assign(subscripted("v", vec![int("1")]), int("1")),
    ]);
    let source = gen_c(&unit, &symbols);
    let reloads = source.matches("memcpy(&__bits_v, &v, sizeof(v));").count();
    assert_eq!(reloads, 1);
    let writebacks =
        source.matches("memcpy(&v, &__bits_v, sizeof(v));").count();
    assert_eq!(writebacks, 2);
}

// ---------------------------------------------------------------------
// MISRA 7.2 / 10.3

#[test]
fn unsigned_literals_carry_a_suffix() {
    let (unit, symbols) = unit_fn(vec![
        var("a", TypeExpr::named("u16"), Some(int("300"))),
        var("b", TypeExpr::named("u64"), Some(int("1"))),
        var("c", TypeExpr::named("i32"), Some(int("-5"))),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("uint16_t a = 300U;"));
    assert!(source.contains("uint64_t b = 1ULL;"));
    assert!(source.contains("int32_t c = -5;"));
}

#[test]
fn promoted_arithmetic_narrows_with_a_cast() {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u8"), Some(int("1"))),
        var("y", TypeExpr::named("u8"), Some(int("2"))),
        var("z", TypeExpr::named("u8"), None),
        assign(chain(&["z"]), binary(BinaryOp::Add, ident("x"), ident("y"))),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("z = (uint8_t)(x + y);"));
}

#[test]
fn bool_conversion_uses_comparison() {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u8"), Some(int("1"))),
        var("ok", TypeExpr::named("bool"), None),
        assign(chain(&["ok"]), ident("x")),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("ok = ((x) != 0U);"));
    assert!(source.contains("#include <stdbool.h>"));
}

// ---------------------------------------------------------------------
// atomics and overflow behavior

#[test]
fn atomic_compound_uses_fetch_form() {
    let mut atomic_u32 = TypeExpr::named("u32");
    atomic_u32.is_atomic = true;
    let (unit, symbols) = unit_fn(vec![
        var("c", atomic_u32, None),
        compound(chain(&["c"]), AssignOp::Add, int("1")),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("_Atomic(uint32_t) c = 0U;"));
    assert!(source
        .contains("atomic_fetch_add_explicit(&c, 1U, memory_order_seq_cst);"));
    assert!(source.contains("#include <stdatomic.h>"));
}

#[test]
fn atomic_multiply_falls_back_to_load_store() {
    let mut atomic_u32 = TypeExpr::named("u32");
    atomic_u32.is_atomic = true;
    let (unit, symbols) = unit_fn(vec![
        var("c", atomic_u32, None),
        compound(chain(&["c"]), AssignOp::Mul, int("2")),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains(
        "uint32_t _cnx_tmp_0 = atomic_load_explicit(&c, memory_order_seq_cst);"
    ));
    assert!(source.contains("_cnx_tmp_0 *= 2U;"));
    assert!(source.contains(
        "atomic_store_explicit(&c, _cnx_tmp_0, memory_order_seq_cst);"
    ));
}

#[test]
fn clamped_add_saturates_through_a_widened_intermediate() {
    let mut clamped = TypeExpr::named("u8");
    clamped.overflow = Some(OverflowBehavior::Clamp);
    let (unit, symbols) = unit_fn(vec![
        var("x", clamped, Some(int("250"))),
        var("y", TypeExpr::named("u8"), Some(int("10"))),
        compound(chain(&["x"]), AssignOp::Add, ident("y")),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("int64_t _cnx_tmp_0 = (int64_t)x + (int64_t)y;"));
    assert!(source.contains(
        "if (_cnx_tmp_0 > (int64_t)UINT8_MAX) { _cnx_tmp_0 = (int64_t)UINT8_MAX; }"
    ));
    assert!(source.contains("x = (uint8_t)_cnx_tmp_0;"));
}

#[test]
fn wrapping_add_truncates_with_a_cast() {
    let mut wrapped = TypeExpr::named("u8");
    wrapped.overflow = Some(OverflowBehavior::Wrap);
    let (unit, symbols) = unit_fn(vec![
        var("x", wrapped, Some(int("250"))),
        compound(chain(&["x"]), AssignOp::Add, int("10")),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("x = (uint8_t)(x + 10);"));
}

// ---------------------------------------------------------------------
// control flow validation

#[test]
fn non_boolean_condition_is_rejected() {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u32"), Some(int("1"))),
        Stmt::If {
            cond: ident("x"),
            then_body: vec![],
            else_body: None,
            pos: p(),
        },
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::NonBooleanCondition);
}

#[test]
fn nested_ternary_is_rejected() {
    let inner = Expr::Ternary {
        cond: Box::new(Expr::BoolLit {
            value: true,
            pos: p(),
        }),
        then_expr: Box::new(int("1")),
        else_expr: Box::new(int("2")),
        pos: p(),
    };
    let (unit, symbols) = unit_fn(vec![var(
        "x",
        TypeExpr::named("u32"),
        Some(Expr::Ternary {
            cond: Box::new(Expr::BoolLit {
                value: true,
                pos: p(),
            }),
            then_expr: Box::new(inner),
            else_expr: Box::new(int("3")),
            pos: p(),
        }),
    )]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::NestedTernary);
}

#[test]
fn call_in_ternary_condition_is_rejected() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    register_fn(&mut symbols, "probe", &[]);
    let cond = binary(
        BinaryOp::Eq,
        Expr::Call(CallExpr {
            callee: PostfixChain::ident("probe", p()),
            args: vec![],
            pos: p(),
        }),
        int("0"),
    );
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![var(
                "x",
                TypeExpr::named("u32"),
                Some(Expr::Ternary {
                    cond: Box::new(cond),
                    then_expr: Box::new(int("1")),
                    else_expr: Box::new(int("2")),
                    pos: p(),
                }),
            )],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::FunctionCallInCondition);
}

#[test]
fn bool_switch_selector_is_rejected() {
    let (unit, symbols) = unit_fn(vec![
        var("flag", TypeExpr::named("bool"), None),
        Stmt::Switch(SwitchStmt {
            selector: ident("flag"),
            cases: vec![
                SwitchCase {
                    labels: vec![int("0")],
                    body: vec![],
                    pos: p(),
                },
                SwitchCase {
                    labels: vec![int("1")],
                    body: vec![],
                    pos: p(),
                },
            ],
            default_covers: None,
            default_body: None,
            pos: p(),
        }),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::BoolSwitch);
}

#[test]
fn switch_needs_two_clauses() {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u32"), Some(int("1"))),
        Stmt::Switch(SwitchStmt {
            selector: ident("x"),
            cases: vec![SwitchCase {
                labels: vec![int("0")],
                body: vec![],
                pos: p(),
            }],
            default_covers: None,
            default_body: None,
            pos: p(),
        }),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::SwitchTooFewClauses);
}

#[test]
fn duplicate_case_labels_are_rejected() {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u32"), Some(int("1"))),
        Stmt::Switch(SwitchStmt {
            selector: ident("x"),
            cases: vec![
                SwitchCase {
                    labels: vec![int("1")],
                    body: vec![],
                    pos: p(),
                },
                SwitchCase {
                    labels: vec![int("1")],
                    body: vec![],
                    pos: p(),
                },
            ],
            default_covers: None,
            default_body: None,
            pos: p(),
        }),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::DuplicateCase);
}

#[test]
fn return_inside_critical_section_is_rejected() {
    let (unit, symbols) = unit_fn(vec![Stmt::CriticalSection {
        body: vec![Stmt::If {
            cond: Expr::BoolLit {
                value: true,
                pos: p(),
            },
            then_body: vec![Stmt::Return {
                value: None,
                pos: p(),
            }],
            else_body: None,
            pos: p(),
        }],
        pos: p(),
    }]);
    assert_eq!(
        gen_kind(&unit, &symbols),
        ErrorKind::EarlyExitInCriticalSection
    );
}

#[test]
fn critical_section_brackets_with_isr_helpers() {
    let (unit, symbols) = unit_fn(vec![Stmt::CriticalSection {
        body: vec![var("x", TypeExpr::named("u8"), Some(int("1")))],
        pos: p(),
    }]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("isr_critical_enter();"));
    assert!(source.contains("isr_critical_exit();"));
    assert!(source.contains("#include \"isr.h\""));
}

// ---------------------------------------------------------------------
// conversion and literal errors

#[test]
fn narrowing_assignment_is_rejected() {
    let (unit, symbols) = unit_fn(vec![
        var("big", TypeExpr::named("u32"), Some(int("1"))),
        var("small", TypeExpr::named("u8"), None),
        assign(chain(&["small"]), ident("big")),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::NarrowingConversion);
}

#[test]
fn sign_conversion_is_rejected() {
    let (unit, symbols) = unit_fn(vec![
        var("s", TypeExpr::named("i32"), Some(int("1"))),
        var("u", TypeExpr::named("u32"), None),
        assign(chain(&["u"]), ident("s")),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::SignConversion);
}

#[test]
fn oversized_literal_is_rejected() {
    let (unit, symbols) =
        unit_fn(vec![var("x", TypeExpr::named("u8"), Some(int("256")))]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::LiteralOutOfRange);
}

#[test]
fn bitmap_field_overflow_is_rejected() {
    let symbols = status_flags_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("flags", TypeExpr::named("StatusFlags"), None),
                assign(chain(&["flags", "Mode"]), int("99")),
            ],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::BitmapFieldOverflow);
}

#[rstest]
#[case("-1", ErrorKind::NegativeShift)]
#[case("9", ErrorKind::ShiftExceedsWidth)]
fn bit_positions_are_range_checked(
    #[case] bit: &str,
    #[case] expect: ErrorKind,
) {
    let (unit, symbols) = unit_fn(vec![
        var("x", TypeExpr::named("u8"), Some(int("0"))),
        assign(subscripted("x", vec![int(bit)]), int("1")),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), expect);
}

#[test]
fn constant_array_index_is_bounds_checked() {
    let (unit, symbols) = unit_fn(vec![
        var("arr", array_ty("u8", 4), None),
        assign(subscripted("arr", vec![int("5")]), int("1")),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::ArrayIndexOutOfBounds);
}

#[test]
fn array_initializer_count_must_match() {
    let (unit, symbols) = unit_fn(vec![var(
        "arr",
        array_ty("u8", 2),
        Some(Expr::ArrayLit {
            elements: vec![int("1"), int("2"), int("3")],
            pos: p(),
        }),
    )]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::ArraySizeMismatch);
}

#[test]
fn array_size_is_inferred_from_the_initializer() {
    let mut inferred = TypeExpr::named("u8");
    inferred.array_dims = vec![None];
    let (unit, symbols) = unit_fn(vec![var(
        "arr",
        inferred,
        Some(Expr::ArrayLit {
            elements: vec![int("1"), int("2"), int("3")],
            pos: p(),
        }),
    )]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("uint8_t arr[3] = {1U, 2U, 3U};"));
}

#[test]
fn fill_all_expands_nonzero_values() {
    let (unit, symbols) = unit_fn(vec![
        var(
            "zeros",
            array_ty("u8", 4),
            Some(Expr::ArrayFill {
                value: Box::new(int("0")),
                pos: p(),
            }),
        ),
        var(
            "sevens",
            array_ty("u8", 3),
            Some(Expr::ArrayFill {
                value: Box::new(int("7")),
                pos: p(),
            }),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("uint8_t zeros[4] = {0};"));
    assert!(source.contains("uint8_t sevens[3] = {7U, 7U, 7U};"));
}

// ---------------------------------------------------------------------
// string errors

#[test]
fn string_literal_overflow_is_rejected() {
    let (unit, symbols) = unit_fn(vec![var(
        "s",
        string_ty(2),
        Some(Expr::StringLit {
            value: "abc".to_owned(),
            pos: p(),
        }),
    )]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::StringLiteralOverflow);
}

#[test]
fn concat_capacity_is_checked() {
    let (unit, symbols) = unit_fn(vec![
        var("a", string_ty(4), None),
        var("b", string_ty(4), None),
        var("d", string_ty(4), None),
        assign(
            chain(&["d"]),
            binary(BinaryOp::Add, ident("a"), ident("b")),
        ),
    ]);
    assert_eq!(
        gen_kind(&unit, &symbols),
        ErrorKind::StringCapacityInsufficient
    );
}

#[test]
fn substring_source_bounds_are_checked() {
    let (unit, symbols) = unit_fn(vec![
        var("src", string_ty(4), None),
        var("d", string_ty(8), None),
        assign(
            chain(&["d"]),
            Expr::Path(subscripted("src", vec![int("2"), int("5")])),
        ),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::SubstringOutOfRange);
}

#[test]
fn substring_destination_capacity_is_checked() {
    let (unit, symbols) = unit_fn(vec![
        var("src", string_ty(8), None),
        var("d", string_ty(2), None),
        assign(
            chain(&["d"]),
            Expr::Path(subscripted("src", vec![int("0"), int("5")])),
        ),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::SubstringDestOverflow);
}

#[test]
fn substring_lowers_to_offset_copy() {
    let (unit, symbols) = unit_fn(vec![
        var("src", string_ty(8), None),
        var("d", string_ty(4), None),
        assign(
            chain(&["d"]),
            Expr::Path(subscripted("src", vec![int("2"), int("3")])),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("strncpy(d, src + 2, 3);"));
    assert!(source.contains("d[3] = '\\0';"));
}

#[test]
fn float_bit_access_requires_a_function_body() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    let unit = Unit {
        items: vec![
            Item::VarDecl(VarDecl {
                name: "v".to_owned(),
                ty: TypeExpr::named("f32"),
                init: None,
                c_style_dims: false,
                pos: p(),
            }),
            Item::VarDecl(VarDecl {
                name: "m".to_owned(),
                ty: TypeExpr::named("u32"),
                init: Some(Expr::Path(subscripted(
                    "v",
                    vec![int("23"), int("8")],
                ))),
                c_style_dims: false,
                pos: p(),
            }),
        ],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::FloatBitAtGlobalScope);
}

// ---------------------------------------------------------------------
// registers and scopes

fn gpio_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_register("GPIO");
    symbols.add_register_member(
        "GPIO",
        "STATUS",
        RegisterMember {
            access: RegisterAccess::ReadOnly,
            bitmap_type: None,
        },
    );
    symbols.add_register_member(
        "GPIO",
        "CTRL",
        RegisterMember {
            access: RegisterAccess::WriteOnly,
            bitmap_type: None,
        },
    );
    symbols
}

#[test]
fn read_only_register_member_rejects_writes() {
    let symbols = gpio_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![assign(chain(&["GPIO", "STATUS"]), int("1"))],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::RegisterReadOnlyWrite);
}

#[test]
fn write_only_register_member_rejects_reads() {
    let symbols = gpio_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![var(
                "v",
                TypeExpr::named("u32"),
                Some(Expr::Path(chain(&["GPIO", "CTRL"]))),
            )],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::RegisterWriteOnlyRead);
}

#[test]
fn register_members_lower_to_underscore_names() {
    let symbols = gpio_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![assign(chain(&["GPIO", "CTRL"]), int("1"))],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("GPIO_CTRL = 1U;"));
}

fn scoped_unit(private: bool, body_in_scope: bool) -> (Unit, SymbolTable) {
    let mut symbols = SymbolTable::new();
    symbols.add_scope("Ctrl");
    symbols.add_scope_member(
        "Ctrl",
        "speed",
        if private {
            Visibility::Private
        } else {
            Visibility::Public
        },
    );
    register_fn(&mut symbols, "Ctrl_tick", &[]);
    register_fn(&mut symbols, "f", &[]);
    let scope_items = vec![
        Item::VarDecl(VarDecl {
            name: "speed".to_owned(),
            ty: TypeExpr::named("u32"),
            init: Some(int("0")),
            c_style_dims: false,
            pos: p(),
        }),
        func("tick", &[], vec![]),
    ];
    let outer_body = if body_in_scope {
        vec![]
    } else {
        vec![assign(chain(&["Ctrl", "speed"]), int("1"))]
    };
    let unit = Unit {
        items: vec![
            Item::Scope {
                name: "Ctrl".to_owned(),
                items: scope_items,
                pos: p(),
            },
            func("f", &[], outer_body),
        ],
    };
    (unit, symbols)
}

#[test]
fn cross_scope_private_access_is_rejected() {
    let (unit, symbols) = scoped_unit(true, false);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::CrossScopePrivate);
}

#[test]
fn public_scope_members_mangle_with_the_scope_name() {
    let (unit, symbols) = scoped_unit(false, false);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("uint32_t Ctrl_speed = 0U;"));
    assert!(!source.contains("static uint32_t Ctrl_speed"));
    assert!(source.contains("Ctrl_speed = 1U;"));
}

#[test]
fn private_scope_members_are_static() {
    let (unit, symbols) = scoped_unit(true, true);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("static uint32_t Ctrl_speed = 0U;"));
}

#[test]
fn self_scope_reference_suggests_this() {
    let mut symbols = SymbolTable::new();
    symbols.add_scope("Ctrl");
    symbols.add_scope_member("Ctrl", "speed", Visibility::Public);
    register_fn(&mut symbols, "Ctrl_tick", &[]);
    let unit = Unit {
        items: vec![Item::Scope {
            name: "Ctrl".to_owned(),
            items: vec![
                Item::VarDecl(VarDecl {
                    name: "speed".to_owned(),
                    ty: TypeExpr::named("u32"),
                    init: Some(int("0")),
                    c_style_dims: false,
                    pos: p(),
                }),
                func(
                    "tick",
                    &[],
                    vec![assign(chain(&["Ctrl", "speed"]), int("1"))],
                ),
            ],
            pos: p(),
        }],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::SelfScopeReference);
}

#[test]
fn this_prefix_reaches_scope_members() {
    let mut symbols = SymbolTable::new();
    symbols.add_scope("Ctrl");
    symbols.add_scope_member("Ctrl", "speed", Visibility::Public);
    register_fn(&mut symbols, "Ctrl_tick", &[]);
    let target = PostfixChain {
        prefix: Prefix::This,
        segments: vec![Segment::plain("speed")],
        pos: p(),
    };
    let unit = Unit {
        items: vec![Item::Scope {
            name: "Ctrl".to_owned(),
            items: vec![
                Item::VarDecl(VarDecl {
                    name: "speed".to_owned(),
                    ty: TypeExpr::named("u32"),
                    init: Some(int("0")),
                    c_style_dims: false,
                    pos: p(),
                }),
                func("tick", &[], vec![assign(target, int("1"))]),
            ],
            pos: p(),
        }],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("Ctrl_speed = 1U;"));
}

#[test]
fn bare_identifier_shadowing_is_ambiguous() {
    let mut symbols = SymbolTable::new();
    symbols.add_scope("Ctrl");
    symbols.add_scope_member("Ctrl", "speed", Visibility::Public);
    register_fn(&mut symbols, "Ctrl_tick", &[]);
    let unit = Unit {
        items: vec![
            Item::VarDecl(VarDecl {
                name: "speed".to_owned(),
                ty: TypeExpr::named("u32"),
                init: Some(int("0")),
                c_style_dims: false,
                pos: p(),
            }),
            Item::Scope {
                name: "Ctrl".to_owned(),
                items: vec![
                    Item::VarDecl(VarDecl {
                        name: "speed".to_owned(),
                        ty: TypeExpr::named("u32"),
                        init: Some(int("0")),
                        c_style_dims: false,
                        pos: p(),
                    }),
                    func(
                        "tick",
                        &[],
                        vec![assign(chain(&["speed"]), int("1"))],
                    ),
                ],
                pos: p(),
            },
        ],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::BareIdentifierAmbiguous);
}

// ---------------------------------------------------------------------
// const and enum rules

#[test]
fn const_local_rejects_assignment() {
    let mut const_u32 = TypeExpr::named("u32");
    const_u32.is_const = true;
    let (unit, symbols) = unit_fn(vec![
        var("k", const_u32, Some(int("5"))),
        assign(chain(&["k"]), int("6")),
    ]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::ConstAssignment);
}

#[test]
fn const_parameter_rejects_assignment() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "g", &[("a", "u32")]);
    let mut const_u32 = TypeExpr::named("u32");
    const_u32.is_const = true;
    let unit = Unit {
        items: vec![Item::Function(Function {
            name: "g".to_owned(),
            params: vec![Param {
                name: "a".to_owned(),
                ty: const_u32,
                pos: p(),
            }],
            ret: None,
            body: vec![assign(chain(&["a"]), int("1"))],
            pos: p(),
        })],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::ConstParameterAssignment);
}

fn color_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_enum("Color", &["Red", "Green", "Blue"]);
    symbols.add_enum("Shape", &["Round", "Square"]);
    symbols
}

#[test]
fn integer_to_enum_is_rejected() {
    let symbols = color_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("c", TypeExpr::named("Color"), None),
                assign(chain(&["c"]), int("5")),
            ],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::IntegerToEnum);
}

#[test]
fn cross_enum_assignment_is_rejected() {
    let symbols = color_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("c", TypeExpr::named("Color"), None),
                assign(chain(&["c"]), Expr::Path(chain(&["Shape", "Round"]))),
            ],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::EnumMismatch);
}

#[test]
fn non_enum_to_enum_is_rejected() {
    let symbols = color_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("c", TypeExpr::named("Color"), None),
                assign(
                    chain(&["c"]),
                    Expr::BoolLit {
                        value: true,
                        pos: p(),
                    },
                ),
            ],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::NonEnumToEnum);
}

#[test]
fn qualified_and_bare_enum_members_are_accepted() {
    let symbols = color_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("c", TypeExpr::named("Color"), None),
                assign(chain(&["c"]), Expr::Path(chain(&["Color", "Blue"]))),
                assign(chain(&["c"]), ident("Green")),
            ],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("c = Color_Blue;"));
    assert!(source.contains("c = Color_Green;"));
}

// ---------------------------------------------------------------------
// declarations

#[test]
fn modifier_conflict_is_rejected() {
    let mut conflicted = TypeExpr::named("u32");
    conflicted.is_atomic = true;
    conflicted.is_volatile = true;
    let (unit, symbols) = unit_fn(vec![var("x", conflicted, None)]);
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::ModifierConflict);
}

#[test]
fn c_style_array_declaration_is_rejected() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![Stmt::VarDecl(VarDecl {
                name: "arr".to_owned(),
                ty: array_ty("u8", 4),
                init: None,
                c_style_dims: true,
                pos: p(),
            })],
        )],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::CStyleArrayDeclaration);
}

#[test]
fn multi_dim_c_style_declaration_is_allowed() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    let mut grid = TypeExpr::named("u8");
    grid.array_dims = vec![Some(int("2")), Some(int("3"))];
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![Stmt::VarDecl(VarDecl {
                name: "grid".to_owned(),
                ty: grid,
                init: None,
                c_style_dims: true,
                pos: p(),
            })],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("uint8_t grid[2][3] = {0};"));
}

#[test]
fn unsupported_sizeof_expression_is_rejected() {
    let (unit, symbols) = unit_fn(vec![
        var("a", TypeExpr::named("u32"), Some(int("1"))),
        var(
            "s",
            TypeExpr::named("u32"),
            Some(Expr::Sizeof {
                operand: Box::new(binary(BinaryOp::Add, ident("a"), int("1"))),
                pos: p(),
            }),
        ),
    ]);
    assert_eq!(
        gen_kind(&unit, &symbols),
        ErrorKind::UnsupportedSizeofExpression
    );
}

#[test]
fn sizeof_array_parameter_is_rejected() {
    let mut symbols = SymbolTable::new();
    let mut data_ty = TypeInfo::of(BaseType::U8);
    data_ty.is_array = true;
    data_ty.array_dims = vec![4];
    symbols.add_function(
        "g",
        FunctionSig {
            return_type: None,
            params: vec![SigParam {
                name: "data".to_owned(),
                ty: data_ty,
                force_pointer: false,
            }],
            callback_type: None,
            language: SourceLanguage::CNext,
            scope: None,
        },
    );
    let unit = Unit {
        items: vec![Item::Function(Function {
            name: "g".to_owned(),
            params: vec![Param {
                name: "data".to_owned(),
                ty: array_ty("u8", 4),
                pos: p(),
            }],
            ret: None,
            body: vec![var(
                "s",
                TypeExpr::named("u32"),
                Some(Expr::Sizeof {
                    operand: Box::new(ident("data")),
                    pos: p(),
                }),
            )],
            pos: p(),
        })],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::SizeofArrayParameter);
}

// ---------------------------------------------------------------------
// includes

#[rstest]
#[case("util.c")]
#[case("util.cpp")]
#[case("util.cxx")]
fn implementation_includes_are_rejected(#[case] path: &str) {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    let unit = Unit {
        items: vec![Item::Include {
            path: path.to_owned(),
            cnx_sibling: false,
            pos: p(),
        }],
    };
    assert_eq!(
        gen_kind(&unit, &symbols),
        ErrorKind::IncludeImplementationFile
    );
}

#[test]
fn header_with_cnx_sibling_is_rejected() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    let unit = Unit {
        items: vec![Item::Include {
            path: "driver.h".to_owned(),
            cnx_sibling: true,
            pos: p(),
        }],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::CnxAlternativeExists);
}

// ---------------------------------------------------------------------
// callbacks

fn callback_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_callback(
        "TimerCb",
        CallbackSignature {
            return_type: None,
            params: vec![],
        },
    );
    symbols.add_callback(
        "OtherCb",
        CallbackSignature {
            return_type: None,
            params: vec![],
        },
    );
    symbols.add_function(
        "consume",
        FunctionSig {
            return_type: None,
            params: vec![SigParam {
                name: "cb".to_owned(),
                ty: TypeInfo::of(BaseType::Named("TimerCb".to_owned())),
                force_pointer: false,
            }],
            callback_type: None,
            language: SourceLanguage::CNext,
            scope: None,
        },
    );
    symbols
}

#[test]
fn callback_nominal_mismatch_is_rejected() {
    let mut symbols = callback_symbols();
    symbols.add_function(
        "handler",
        FunctionSig {
            return_type: None,
            params: vec![],
            callback_type: Some("OtherCb".to_owned()),
            language: SourceLanguage::CNext,
            scope: None,
        },
    );
    let unit = Unit {
        items: vec![func("f", &[], vec![call("consume", vec![ident("handler")])])],
    };
    assert_eq!(gen_kind(&unit, &symbols), ErrorKind::CallbackNominalMismatch);
}

#[test]
fn callback_signature_mismatch_is_rejected() {
    let mut symbols = callback_symbols();
    symbols.add_function(
        "handler",
        FunctionSig {
            return_type: Some(TypeInfo::of(BaseType::U32)),
            params: vec![],
            callback_type: None,
            language: SourceLanguage::CNext,
            scope: None,
        },
    );
    let unit = Unit {
        items: vec![func("f", &[], vec![call("consume", vec![ident("handler")])])],
    };
    assert_eq!(
        gen_kind(&unit, &symbols),
        ErrorKind::CallbackSignatureMismatch
    );
}

#[test]
fn matching_callback_passes_verbatim() {
    let mut symbols = callback_symbols();
    symbols.add_function(
        "handler",
        FunctionSig {
            return_type: None,
            params: vec![],
            callback_type: Some("TimerCb".to_owned()),
            language: SourceLanguage::CNext,
            scope: None,
        },
    );
    let unit = Unit {
        items: vec![func("f", &[], vec![call("consume", vec![ident("handler")])])],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("consume(handler);"));
}

// ---------------------------------------------------------------------
// struct members, arrays and register bitmap fields

#[test]
fn struct_member_chain_lowers_with_a_dot() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_struct(
        "Point",
        StructDef {
            fields: vec![StructFieldDef {
                name: "x".to_owned(),
                ty: TypeInfo::of(BaseType::U32),
            }],
            language: SourceLanguage::CNext,
        },
    );
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![
                var("s", TypeExpr::named("Point"), None),
                assign(chain(&["s", "x"]), int("1")),
            ],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("Point s = {0};"));
    assert!(source.contains("s.x = 1U;"));
}

#[test]
fn multi_dim_elements_check_every_dimension() {
    let mut grid = TypeExpr::named("u8");
    grid.array_dims = vec![Some(int("2")), Some(int("3"))];
    let mut target = Segment::plain("grid");
    target.subscripts.push(SubscriptGroup {
        exprs: vec![int("1")],
    });
    target.subscripts.push(SubscriptGroup {
        exprs: vec![int("2")],
    });
    let (unit, symbols) = unit_fn(vec![
        var("grid", grid, None),
        assign(
            PostfixChain {
                prefix: Prefix::None,
                segments: vec![target],
                pos: p(),
            },
            int("3"),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("grid[1][2] = 3U;"));
}

#[test]
fn array_slice_lowers_to_memcpy() {
    let (unit, symbols) = unit_fn(vec![
        var("buf", array_ty("u8", 8), None),
        var("src", array_ty("u8", 4), None),
        assign(
            subscripted("buf", vec![int("2"), int("3")]),
            ident("src"),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source
        .contains("memcpy(&buf[2], src, 3 * sizeof(buf[0]));"));
    assert!(source.contains("#include <string.h>"));
}

#[test]
fn array_element_bit_write_masks_the_element() {
    let (unit, symbols) = unit_fn(vec![
        var("bits", array_ty("u8", 2), None),
        assign(
            {
                let mut segment = Segment::plain("bits");
                segment.subscripts.push(SubscriptGroup {
                    exprs: vec![int("1")],
                });
                segment.subscripts.push(SubscriptGroup {
                    exprs: vec![int("3")],
                });
                PostfixChain {
                    prefix: Prefix::None,
                    segments: vec![segment],
                    pos: p(),
                }
            },
            int("1"),
        ),
    ]);
    let source = gen_c(&unit, &symbols);
    assert!(source.contains(
        "bits[1] = (uint8_t)((bits[1] & ~(1U << 3)) | (((uint8_t)1 & 1U) << 3));"
    ));
}

#[test]
fn register_member_bitmap_field_write() {
    let mut symbols = status_flags_symbols();
    symbols.add_register("GPIO");
    symbols.add_register_member(
        "GPIO",
        "CFG",
        RegisterMember {
            access: RegisterAccess::ReadWrite,
            bitmap_type: Some("StatusFlags".to_owned()),
        },
    );
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![assign(chain(&["GPIO", "CFG", "Mode"]), int("2"))],
        )],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains(
        "GPIO_CFG = (uint8_t)((GPIO_CFG & ~(15U << 4)) | (((uint8_t)2 & 15U) << 4));"
    ));
}

#[test]
fn register_bit_write_masks_the_member() {
    let mut symbols = status_flags_symbols();
    symbols.add_register("GPIO");
    symbols.add_register_member(
        "GPIO",
        "CFG",
        RegisterMember {
            access: RegisterAccess::ReadWrite,
            bitmap_type: Some("StatusFlags".to_owned()),
        },
    );
    let mut member = Segment::plain("CFG");
    member.subscripts.push(SubscriptGroup {
        exprs: vec![int("0")],
    });
    let target = PostfixChain {
        prefix: Prefix::None,
        segments: vec![Segment::plain("GPIO"), member],
        pos: p(),
    };
    let unit = Unit {
        items: vec![func("f", &[], vec![assign(target, int("1"))])],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains(
        "GPIO_CFG = (uint8_t)((GPIO_CFG & ~(1U << 0)) | (((uint8_t)1 & 1U) << 0));"
    ));
}

// ---------------------------------------------------------------------
// C++ class aggregates

fn motor_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "f", &[]);
    symbols.add_struct(
        "Motor",
        StructDef {
            fields: vec![StructFieldDef {
                name: "rpm".to_owned(),
                ty: TypeInfo::of(BaseType::U32),
            }],
            language: SourceLanguage::Cpp,
        },
    );
    symbols
}

#[test]
fn cpp_class_aggregate_initializes_per_field() {
    let symbols = motor_symbols();
    let unit = Unit {
        items: vec![func(
            "f",
            &[],
            vec![var(
                "m",
                TypeExpr::named("Motor"),
                Some(Expr::ArrayLit {
                    elements: vec![int("1")],
                    pos: p(),
                }),
            )],
        )],
    };
    let source = gen_cpp(&unit, &symbols);
    assert!(source.contains("Motor m;"));
    assert!(source.contains("m.rpm = 1U;"));
}

#[test]
fn cpp_class_aggregate_rejected_at_global_scope() {
    let symbols = motor_symbols();
    let unit = Unit {
        items: vec![Item::VarDecl(VarDecl {
            name: "m".to_owned(),
            ty: TypeExpr::named("Motor"),
            init: Some(Expr::ArrayLit {
                elements: vec![int("1")],
                pos: p(),
            }),
            c_style_dims: false,
            pos: p(),
        })],
    };
    let err = generate(&unit, &symbols, Options { cpp_mode: true })
        .expect_err("generation fails");
    assert_eq!(kind_of(&err), Some(ErrorKind::CppAggregateAtGlobal));
}

// ---------------------------------------------------------------------
// rvalue argument shaping

#[test]
fn literal_argument_uses_a_compound_literal_in_c() {
    let mut symbols = SymbolTable::new();
    register_fn(&mut symbols, "inc", &[("n", "u32")]);
    register_fn(&mut symbols, "f", &[]);
    let unit = Unit {
        items: vec![
            func(
                "inc",
                &[("n", "u32")],
                vec![assign(chain(&["n"]), int("0"))],
            ),
            func("f", &[], vec![call("inc", vec![int("42")])]),
        ],
    };
    let source = gen_c(&unit, &symbols);
    assert!(source.contains("inc(&(uint32_t){42U});"));
    let source_cpp = gen_cpp(&unit, &symbols);
    assert!(source_cpp.contains("inc(42U);"));
}
