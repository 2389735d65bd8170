//! Tests for subtyping, assignability and substitution.

use etsl_checker::*;
use etsl_common::{DeclRef, UnitId};
use smallvec::smallvec;

fn decl(node: u32) -> DeclRef {
    DeclRef::new(UnitId(0), node)
}

fn function(interner: &mut TypeInterner, params: &[TypeId], ret: TypeId) -> TypeId {
    interner.function(FunctionShape {
        type_params: TypeList::new(),
        params: params.iter().copied().map(ParamInfo::required).collect(),
        ret,
    })
}

/// `class Animal {}`, `class Dog extends Animal {}`, `interface Pet {}`,
/// `class Cat extends Animal implements Pet {}`.
struct Hierarchy {
    interner: TypeInterner,
    animal: TypeId,
    dog: TypeId,
    pet: TypeId,
    cat: TypeId,
}

fn hierarchy() -> Hierarchy {
    let mut interner = TypeInterner::new();
    let animal = interner.class(decl(1), "Animal", TypeList::new());
    let dog = interner.class(decl(2), "Dog", TypeList::new());
    let pet = interner.interface(decl(3), "Pet", TypeList::new());
    let cat = interner.class(decl(4), "Cat", TypeList::new());
    interner.register_class(
        decl(1),
        ClassInfo {
            name: "Animal".into(),
            ..ClassInfo::default()
        },
    );
    interner.register_class(
        decl(2),
        ClassInfo {
            name: "Dog".into(),
            extends: Some(animal),
            ..ClassInfo::default()
        },
    );
    interner.register_class(
        decl(3),
        ClassInfo {
            name: "Pet".into(),
            is_interface: true,
            ..ClassInfo::default()
        },
    );
    interner.register_class(
        decl(4),
        ClassInfo {
            name: "Cat".into(),
            extends: Some(animal),
            implements: vec![pet],
            ..ClassInfo::default()
        },
    );
    Hierarchy {
        interner,
        animal,
        dog,
        pet,
        cat,
    }
}

#[test]
fn test_numeric_widening_only_when_assignable() {
    let mut interner = TypeInterner::new();
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_assignable(TypeId::INT, TypeId::DOUBLE));
    assert!(relation.is_assignable(TypeId::CHAR, TypeId::LONG));
    assert!(!relation.is_assignable(TypeId::DOUBLE, TypeId::INT));
    assert!(!relation.is_subtype(TypeId::INT, TypeId::DOUBLE));
}

#[test]
fn test_object_accepts_everything_but_void() {
    let mut interner = TypeInterner::new();
    let array = interner.array(TypeId::INT);
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_assignable(TypeId::INT, TypeId::OBJECT));
    assert!(relation.is_assignable(array, TypeId::OBJECT));
    assert!(!relation.is_assignable(TypeId::VOID, TypeId::OBJECT));
    // Primitives are boxed, so they are not subtypes of Object.
    assert!(!relation.is_subtype(TypeId::INT, TypeId::OBJECT));
    assert!(relation.is_subtype(TypeId::STRING, TypeId::OBJECT));
}

#[test]
fn test_nominal_class_relations() {
    let Hierarchy {
        mut interner,
        animal,
        dog,
        pet,
        cat,
    } = hierarchy();
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_subtype(dog, animal));
    assert!(relation.is_subtype(cat, pet));
    assert!(!relation.is_subtype(animal, dog));
    assert!(!relation.is_subtype(dog, pet));
    assert!(!relation.is_subtype(dog, cat));
}

#[test]
fn test_arrays_are_covariant() {
    let Hierarchy {
        mut interner,
        animal,
        dog,
        ..
    } = hierarchy();
    let dogs = interner.array(dog);
    let animals = interner.array(animal);
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_subtype(dogs, animals));
    assert!(!relation.is_subtype(animals, dogs));
}

#[test]
fn test_function_parameters_are_contravariant() {
    let Hierarchy {
        mut interner,
        animal,
        dog,
        ..
    } = hierarchy();
    let takes_animal = function(&mut interner, &[animal], TypeId::VOID);
    let takes_dog = function(&mut interner, &[dog], TypeId::VOID);
    let returns_dog = function(&mut interner, &[], dog);
    let returns_animal = function(&mut interner, &[], animal);
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_subtype(takes_animal, takes_dog));
    assert!(!relation.is_subtype(takes_dog, takes_animal));
    assert!(relation.is_subtype(returns_dog, returns_animal));
    assert!(!relation.is_subtype(returns_animal, returns_dog));
}

#[test]
fn test_function_with_fewer_parameters_is_assignable() {
    let mut interner = TypeInterner::new();
    let unary = function(&mut interner, &[TypeId::INT], TypeId::INT);
    let binary = function(&mut interner, &[TypeId::INT, TypeId::INT], TypeId::INT);
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_assignable(unary, binary));
    assert!(!relation.is_assignable(binary, unary));
}

#[test]
fn test_union_relations() {
    let mut interner = TypeInterner::new();
    let int_or_string = interner.union([TypeId::INT, TypeId::STRING]);
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_subtype(TypeId::INT, int_or_string));
    assert!(!relation.is_subtype(int_or_string, TypeId::INT));
    assert!(relation.is_assignable(int_or_string, TypeId::OBJECT));
}

#[test]
fn test_generic_heritage_is_substituted() {
    // class Box<T> {}; class IntBox extends Box<int> {}
    let mut interner = TypeInterner::new();
    let t = interner.type_param(decl(11), "T");
    let box_int = interner.class(decl(10), "Box", smallvec![TypeId::INT]);
    let box_string = interner.class(decl(10), "Box", smallvec![TypeId::STRING]);
    let int_box = interner.class(decl(12), "IntBox", TypeList::new());
    interner.register_class(
        decl(10),
        ClassInfo {
            name: "Box".into(),
            type_params: smallvec![t],
            ..ClassInfo::default()
        },
    );
    interner.register_class(
        decl(12),
        ClassInfo {
            name: "IntBox".into(),
            extends: Some(box_int),
            ..ClassInfo::default()
        },
    );
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_subtype(int_box, box_int));
    assert!(!relation.is_subtype(int_box, box_string));
    assert!(!relation.is_subtype(box_int, box_string));
}

#[test]
fn test_cyclic_heritage_terminates() {
    let mut interner = TypeInterner::new();
    let a = interner.class(decl(1), "A", TypeList::new());
    let b = interner.class(decl(2), "B", TypeList::new());
    let other = interner.class(decl(3), "C", TypeList::new());
    interner.register_class(
        decl(1),
        ClassInfo {
            name: "A".into(),
            extends: Some(b),
            ..ClassInfo::default()
        },
    );
    interner.register_class(
        decl(2),
        ClassInfo {
            name: "B".into(),
            extends: Some(a),
            ..ClassInfo::default()
        },
    );
    let mut relation = Relation::new(&mut interner);
    assert!(relation.is_subtype(a, b));
    // The cycle is assumed to hold on re-entry, but unrelated targets fail.
    let _ = relation.is_subtype(a, other);
}

#[test]
fn test_common_supertype() {
    let Hierarchy {
        mut interner,
        animal,
        dog,
        ..
    } = hierarchy();
    let mut relation = Relation::new(&mut interner);
    assert_eq!(relation.common_supertype(TypeId::INT, TypeId::FLOAT), TypeId::FLOAT);
    assert_eq!(relation.common_supertype(dog, animal), animal);
    let mixed = relation.common_supertype(TypeId::INT, TypeId::STRING);
    drop(relation);
    assert_eq!(format_type(&interner, mixed), "int | string");
}

#[test]
fn test_format_function_type() {
    let mut interner = TypeInterner::new();
    let strings = interner.array(TypeId::STRING);
    let shape = FunctionShape {
        type_params: TypeList::new(),
        params: vec![
            ParamInfo::required(TypeId::INT),
            ParamInfo {
                ty: TypeId::BOOLEAN,
                optional: true,
                rest: false,
            },
            ParamInfo {
                ty: strings,
                optional: false,
                rest: true,
            },
        ],
        ret: TypeId::VOID,
    };
    let f = interner.function(shape);
    assert_eq!(
        format_type(&interner, f),
        "(p0: int, p1?: boolean, ...p2: string[]) => void"
    );
}
