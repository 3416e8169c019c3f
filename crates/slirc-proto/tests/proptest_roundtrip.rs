//! Property-based tests for the line codec.
//!
//! Uses proptest to generate random lines and verify that:
//! 1. Encoding a command and decoding it yields the same command and args
//! 2. Splitting the byte stream at any offset yields the same events

use bytes::BytesMut;
use proptest::prelude::*;
use slirc_proto::{encode_line, Event, LineCodec};
use tokio_util::codec::Decoder;

// =============================================================================
// STRATEGIES - Generators for valid IRC components
// =============================================================================

fn command_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Z]{3,10}").expect("valid regex"),
        prop::string::string_regex("[0-9]{3}").expect("valid regex"),
    ]
}

/// Middle argument: no spaces, no leading colon, no line terminators.
fn middle_arg_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9#&@!._\\-\\[\\]]{1,16}").expect("valid regex")
}

/// Trailing text: anything except line terminators, including spaces and colons.
fn trailing_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0]{0,80}").expect("valid regex")
}

fn prefix_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        prop::string::string_regex("[a-z]{1,9}![a-z]{1,9}@[a-z.]{1,20}").expect("valid regex"),
        prop::string::string_regex("[a-z]{1,10}\\.[a-z]{2,5}").expect("valid regex"),
    ]
}

fn event_strategy() -> impl Strategy<Value = Event> {
    (
        prefix_strategy(),
        command_strategy(),
        prop::collection::vec(middle_arg_strategy(), 0..5),
        prop::option::of(trailing_strategy()),
    )
        .prop_map(|(prefix, command, mut args, trailing)| {
            if let Some(t) = trailing {
                args.push(t);
            }
            Event {
                prefix,
                command,
                args,
            }
        })
}

fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<Event> {
    let mut out = Vec::new();
    while let Some(event) = codec.decode(buf).expect("decode never fails") {
        out.push(event);
    }
    out
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn format_then_parse_roundtrip(event in event_strategy()) {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&encode_line(&event.to_string())[..]);

        let decoded = decode_all(&mut codec, &mut buf);
        prop_assert_eq!(decoded, vec![event]);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn split_stream_decodes_identically(
        events in prop::collection::vec(event_strategy(), 1..8),
        split_seed in any::<prop::sample::Index>(),
    ) {
        let mut wire = Vec::new();
        for event in &events {
            wire.extend_from_slice(&encode_line(&event.to_string()));
        }
        let split = split_seed.index(wire.len() + 1);

        let mut whole_codec = LineCodec::new();
        let mut whole = BytesMut::from(&wire[..]);
        let expected = decode_all(&mut whole_codec, &mut whole);

        let mut split_codec = LineCodec::new();
        let mut buf = BytesMut::from(&wire[..split]);
        let mut got = decode_all(&mut split_codec, &mut buf);
        buf.extend_from_slice(&wire[split..]);
        got.extend(decode_all(&mut split_codec, &mut buf));

        prop_assert_eq!(&got, &expected);
        prop_assert_eq!(got, events);
    }

    #[test]
    fn parse_never_panics(line in "[^\r\n]{0,200}") {
        let _ = Event::parse(&line);
    }
}
