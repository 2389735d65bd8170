use super::*;
use etsl_common::UnitId;

fn decl(node: u32) -> DeclRef {
    DeclRef::new(UnitId(0), node)
}

#[test]
fn test_interner_intrinsics() {
    let interner = TypeInterner::new();
    assert_eq!(
        interner.lookup(TypeId::INT),
        Some(&TypeData::Intrinsic(IntrinsicKind::Int))
    );
    assert_eq!(
        interner.lookup(TypeId::OBJECT),
        Some(&TypeData::Intrinsic(IntrinsicKind::Object))
    );
    assert_eq!(interner.len() as u32, TypeId::INTRINSIC_COUNT);
}

#[test]
fn test_interner_deduplication() {
    let mut interner = TypeInterner::new();
    let a = interner.array(TypeId::INT);
    let b = interner.array(TypeId::INT);
    let c = interner.array(TypeId::LONG);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_interner_union_normalization() {
    let mut interner = TypeInterner::new();

    assert_eq!(interner.union([TypeId::STRING]), TypeId::STRING);
    assert_eq!(interner.union([TypeId::STRING, TypeId::NEVER]), TypeId::STRING);
    assert_eq!(interner.union([]), TypeId::NEVER);
    assert_eq!(interner.union([TypeId::STRING, TypeId::ERROR]), TypeId::ERROR);

    let ab = interner.union([TypeId::INT, TypeId::NULL]);
    let ba = interner.union([TypeId::NULL, TypeId::INT, TypeId::INT]);
    assert_eq!(ab, ba);

    let nested = interner.union([ab, TypeId::STRING]);
    let members = interner.union_members(nested).unwrap();
    assert_eq!(members.len(), 3);
}

#[test]
fn test_substitute_replaces_type_parameters() {
    let mut interner = TypeInterner::new();
    let t = interner.type_param(decl(1), "T");
    let box_t = interner.class(decl(0), "Box", smallvec![t]);
    let array_t = interner.array(t);
    let func = interner.function(FunctionShape {
        type_params: TypeList::new(),
        params: vec![ParamInfo::required(t)],
        ret: array_t,
    });

    let map: FxHashMap<TypeId, TypeId> = [(t, TypeId::INT)].into_iter().collect();
    let box_int = interner.substitute(box_t, &map);
    assert_eq!(interner.class_ref(box_int).unwrap().args.as_slice(), &[TypeId::INT]);

    let func_int = interner.substitute(func, &map);
    let shape = interner.function_shape(func_int).unwrap().clone();
    assert_eq!(shape.params[0].ty, TypeId::INT);
    assert_eq!(interner.array_element(shape.ret), Some(TypeId::INT));
    assert!(!interner.contains_type_parameters(func_int));
    assert!(interner.contains_type_parameters(func));
}

#[test]
fn test_class_substitution_uses_registry() {
    let mut interner = TypeInterner::new();
    let t = interner.type_param(decl(1), "T");
    interner.register_class(
        decl(0),
        ClassInfo {
            name: "Box".to_string(),
            type_params: smallvec![t],
            ..ClassInfo::default()
        },
    );
    let box_int = interner.class(decl(0), "Box", smallvec![TypeId::INT]);
    let class = interner.class_ref(box_int).unwrap().clone();
    let map = interner.class_substitution(&class);
    assert_eq!(map.get(&t), Some(&TypeId::INT));
}

#[test]
fn test_reference_classification() {
    let mut interner = TypeInterner::new();
    assert!(!interner.is_reference(TypeId::INT));
    assert!(interner.is_reference(TypeId::STRING));
    let array = interner.array(TypeId::INT);
    assert!(interner.is_reference(array));
    let nullable = interner.union([TypeId::INT, TypeId::STRING]);
    assert!(interner.is_reference(nullable));
}
