use hex_literal::hex;
use memreflect::{
    CheckedNamed, Context, Each, EachNamed, ErrorKind, FieldMut, FieldRef, TypeDeclaration, TypeId,
    construct, describe_type, destruct, id_of, make_context, obtain_id, visit, visit_mut, visit_value,
};

#[repr(C, align(8))]
struct Frame([u8; 16]);

// magic, version, flags, payload length; native endianness is decoded below
const FRAME: [u8; 16] = hex!("cafef00d 0200 0100 4000000000000000");

fn frame_context() -> (Context, TypeId) {
    let mut ctx = make_context().expect("context");
    let mut decl = TypeDeclaration::with_size(&ctx, "FrameHeader", 16).align(8);
    decl.emplace_at::<u32>("magic", 0).expect("magic");
    decl.emplace_at::<u16>("version", 4).expect("version");
    decl.emplace_at::<u16>("flags", 6).expect("flags");
    decl.emplace_at::<u64>("length", 8).expect("length");
    let declared = decl.finish().expect("finish");
    let id = ctx.add_type(declared).expect("frame header");
    (ctx, id)
}

#[test]
fn byte_buffers_decode_through_declared_offsets() {
    let (ctx, id) = frame_context();
    let frame = Frame(FRAME);
    let mut decoded = Vec::new();
    unsafe {
        visit(&ctx, frame.0.as_ptr(), id, EachNamed(|field: FieldRef<'_>, name: &str| {
            let value = if let Some(v) = field.downcast_ref::<u32>() {
                u64::from(*v)
            } else if let Some(v) = field.downcast_ref::<u16>() {
                u64::from(*v)
            } else if let Some(v) = field.downcast_ref::<u64>() {
                *v
            } else {
                panic!("unexpected field type for {name}");
            };
            decoded.push((name.to_owned(), value));
        }))
    }
    .expect("visit");

    let bytes = FRAME;
    let expected = vec![
        ("magic".to_owned(), u64::from(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))),
        ("version".to_owned(), u64::from(u16::from_ne_bytes([bytes[4], bytes[5]]))),
        ("flags".to_owned(), u64::from(u16::from_ne_bytes([bytes[6], bytes[7]]))),
        ("length".to_owned(), u64::from_ne_bytes(bytes[8..16].try_into().expect("eight bytes"))),
    ];
    assert_eq!(decoded, expected);
}

#[test]
fn mutable_visits_patch_the_buffer() {
    let (ctx, id) = frame_context();
    let mut frame = Frame(FRAME);
    unsafe {
        visit_mut(&ctx, frame.0.as_mut_ptr(), id, EachNamed(|field: FieldMut<'_>, name: &str| {
            if name == "flags" {
                if let Some(flags) = field.into_mut::<u16>() {
                    *flags = 0;
                }
            }
        }))
    }
    .expect("visit_mut");
    assert_eq!(&frame.0[6..8], &[0, 0], "only the flags field is cleared");
    assert_eq!(&frame.0[..6], &FRAME[..6]);
    assert_eq!(&frame.0[8..], &FRAME[8..]);
}

#[test]
fn rejecting_visitors_stop_the_walk() {
    let (ctx, id) = frame_context();
    let frame = Frame(FRAME);
    let mut seen = Vec::new();
    let err = unsafe {
        visit(&ctx, frame.0.as_ptr(), id, CheckedNamed(|_: FieldRef<'_>, name: &str| {
            seen.push(name.to_owned());
            name != "version"
        }))
    }
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(seen, ["magic", "version"]);
}

#[test]
fn unknown_roots_produce_no_callbacks() {
    let ctx = make_context().expect("context");
    let frame = Frame(FRAME);
    let mut calls = 0;
    let err = unsafe { visit(&ctx, frame.0.as_ptr(), obtain_id("Nope"), Each(|_: FieldRef<'_>| calls += 1)) }
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnregisteredId);
    assert_eq!(calls, 0);
}

#[repr(C)]
struct Inventory {
    owner: String,
    counts: Vec<u32>,
    names: Vec<Vec<String>>,
}

#[test]
fn sequence_fields_arrive_typed_and_survive_a_lifecycle() {
    let mut ctx = make_context().expect("context");
    let mut decl = TypeDeclaration::new(&ctx, "Inventory");
    decl.emplace::<String>("owner").expect("owner");
    decl.emplace::<Vec<u32>>("counts").expect("counts");
    decl.emplace::<Vec<Vec<String>>>("names").expect("names");
    let declared = decl.finish().expect("finish");
    let id = ctx.add_type(declared).expect("inventory");
    assert_eq!(
        ctx.size(id),
        std::mem::size_of::<Inventory>(),
        "aligned auto offsets reproduce the repr(C) layout"
    );

    let mut slot = std::mem::MaybeUninit::<Inventory>::uninit();
    let data = slot.as_mut_ptr().cast::<u8>();
    unsafe { construct(&ctx, data, id) }.expect("construct");
    unsafe {
        visit_mut(&ctx, data, id, Each(|mut field: FieldMut<'_>| {
            if let Some(counts) = field.downcast_mut::<Vec<u32>>() {
                counts.extend([1, 2, 3]);
            }
            if let Some(names) = field.downcast_mut::<Vec<Vec<String>>>() {
                names.push(vec!["a".into(), "b".into()]);
            }
        }))
    }
    .expect("fill");

    let inventory = unsafe { slot.assume_init_ref() };
    assert!(inventory.owner.is_empty());
    assert_eq!(inventory.counts, [1, 2, 3]);
    assert_eq!(inventory.names, [vec!["a".to_owned(), "b".to_owned()]]);

    unsafe { destruct(&ctx, data, id) }.expect("destruct");
}

#[derive(Default)]
#[allow(dead_code)]
struct Score {
    player: u32,
    points: i64,
}

memreflect::reflect_struct!(Score { player: u32, points: i64 });

#[test]
fn safe_visits_and_descriptions_agree() {
    let mut ctx = make_context().expect("context");
    ctx.register::<Score>().expect("score");
    let score = Score { player: 4, points: -20 };

    let mut total = 0i64;
    visit_value(&ctx, &score, Each(|field: FieldRef<'_>| {
        if let Some(player) = field.downcast_ref::<u32>() {
            total += i64::from(*player);
        } else if let Some(points) = field.downcast_ref::<i64>() {
            total += *points;
        }
    }))
    .expect("visit");
    assert_eq!(total, -16);

    let rendered = describe_type(&ctx, id_of::<Score>()).to_string();
    assert!(rendered.contains("player: u32 @"), "description lists fields: {rendered}");
    assert!(rendered.contains("aggregate"), "bridge types are flagged: {rendered}");
}
