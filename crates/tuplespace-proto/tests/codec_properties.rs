//! Property tests for the field codec and the matching rule.

use proptest::prelude::*;
use tuplespace_proto::{
    ClientMessage, Field, FieldType, Operation, ServerMessage, Tuple, Value,
    codec::{get_field, put_field},
};

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<u32>().prop_map(Value::Uint),
        any::<i32>().prop_map(Value::Int),
        any::<f32>().prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        "[a-zA-Z0-9 _é]{0,24}".prop_map(Value::String),
    ]
}

fn field() -> impl Strategy<Value = Field> {
    (value(), any::<bool>()).prop_map(|(value, data)| Field::from_value(value, data))
}

fn data_tuple() -> impl Strategy<Value = Tuple> {
    prop::collection::vec(value().prop_map(Field::Value), 1..=16)
        .prop_map(|fields| Tuple::new(fields).unwrap())
}

fn any_tuple() -> impl Strategy<Value = Tuple> {
    prop::collection::vec(field(), 1..=16).prop_map(|fields| Tuple::new(fields).unwrap())
}

fn operation() -> impl Strategy<Value = Operation> {
    prop::sample::select(Operation::ALL.to_vec())
}

/// Same type, different payload where the type has room for one.
fn perturb(value: &Value) -> Value {
    match value {
        Value::Uint(v) => Value::Uint(v.wrapping_add(1)),
        Value::Int(v) => Value::Int(v.wrapping_sub(1)),
        Value::Float(v) => Value::Float(f32::from_bits(v.to_bits() ^ 1)),
        Value::Bool(v) => Value::Bool(!v),
        Value::String(v) => Value::String(format!("{v}!")),
    }
}

fn other_type(field_type: FieldType) -> FieldType {
    let index = FieldType::ALL.iter().position(|t| *t == field_type).unwrap();
    FieldType::ALL[(index + 1) % FieldType::ALL.len()]
}

proptest! {
    #[test]
    fn field_round_trip(field in field()) {
        let mut buf = Vec::new();
        put_field(&mut buf, &field).unwrap();
        let mut src = buf.as_slice();
        prop_assert_eq!(get_field(&mut src).unwrap(), field);
        prop_assert!(src.is_empty());
    }

    #[test]
    fn client_message_round_trip(tuple in any_tuple(), op in operation()) {
        let mut buf = vec![0u8; 4096];
        for message in [
            ClientMessage::SendTuple(tuple.clone()),
            ClientMessage::GetTuple { template: tuple.clone(), operation: op },
        ] {
            let n = message.encode_into(&mut buf).unwrap();
            prop_assert_eq!(ClientMessage::decode(&buf[..n]).unwrap(), message);
        }
    }

    #[test]
    fn server_message_round_trip(tuple in data_tuple()) {
        let mut buf = vec![0u8; 4096];
        let message = ServerMessage::Tuple(tuple);
        let n = message.encode_into(&mut buf).unwrap();
        prop_assert_eq!(ServerMessage::decode(&buf[..n]).unwrap(), message);
    }

    #[test]
    fn data_tuple_matches_itself(tuple in data_tuple()) {
        prop_assert!(tuple.is_data());
        prop_assert!(tuple.matches(&tuple));
    }

    #[test]
    fn wildcard_position_accepts_any_value(tuple in data_tuple(), pick in any::<prop::sample::Index>()) {
        let i = pick.index(tuple.arity());
        let mut template = tuple.clone().into_fields();
        template[i] = Field::wildcard(template[i].field_type());
        let template = Tuple::new(template).unwrap();

        let mut data = tuple.into_fields();
        let replaced = match &data[i] {
            Field::Value(value) => Field::Value(perturb(value)),
            other => other.clone(),
        };
        data[i] = replaced;
        let data = Tuple::new(data).unwrap();

        prop_assert!(template.matches(&data));
    }

    #[test]
    fn type_mismatch_never_matches(
        tuple in data_tuple(),
        pick in any::<prop::sample::Index>(),
        wildcard in any::<bool>(),
    ) {
        let i = pick.index(tuple.arity());
        let mut template = tuple.clone().into_fields();
        let swapped = other_type(template[i].field_type());
        template[i] = if wildcard {
            Field::wildcard(swapped)
        } else {
            match swapped {
                FieldType::Uint => Field::uint(0),
                FieldType::Int => Field::int(0),
                FieldType::Float => Field::float(0.0),
                FieldType::String => Field::string(""),
                FieldType::Bool => Field::bool(false),
            }
        };
        let template = Tuple::new(template).unwrap();

        prop_assert!(!template.matches(&tuple));
    }

    #[test]
    fn decoding_arbitrary_bytes_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
        let _ = ClientMessage::decode(&bytes);
        let _ = ServerMessage::decode(&bytes);
    }
}

#[test]
fn string_length_boundaries() {
    let mut buf = vec![0u8; 70_000];
    for len in [0usize, 65_535] {
        let tuple = Tuple::new(vec![Field::string("a".repeat(len))]).unwrap();
        let message = ServerMessage::Tuple(tuple);
        let n = message.encode_into(&mut buf).unwrap();
        assert_eq!(n, 1 + 1 + 2 + len);
        assert_eq!(ServerMessage::decode(&buf[..n]).unwrap(), message);
    }

    let too_long = Tuple::new(vec![Field::string("a".repeat(65_536))]).unwrap();
    assert!(ServerMessage::Tuple(too_long).encode_into(&mut buf).is_err());
}
