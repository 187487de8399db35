/// Protocol conformance tests for the record decoder

use feed_common::{
    ConsistencyPolicy, DecodeWarning, DecoderOptions, FeedError, FieldCode, Quote, RecordDecoder,
    RecordEncoder,
};
use feed_common::net::{STATUS_QUOTE, TERMINATOR};

fn full_quote(symbol: &str) -> Quote {
    Quote {
        bid: Some(37.25),
        ask: Some(37.5),
        last: Some(37.375),
        bid_size: Some(1_200),
        ask_size: Some(800),
        bid_id: Some('N'),
        ask_id: Some('P'),
        volume: Some(4_567_890),
        last_size: Some(100),
        trade_time: Some("14:30:05".to_string()),
        quote_time: Some("14:30:06".to_string()),
        high: Some(38.0),
        low: Some(36.125),
        tick: Some('+'),
        prev_close: Some(36.75),
        exchange: Some('Q'),
        island_bid: Some(37.1875),
        island_ask: Some(37.5625),
        island_volume: Some(12_000),
        ..Quote::new(symbol)
    }
}

#[test]
fn test_roundtrip_every_field() {
    let quote = full_quote("INTC");
    let msg = RecordEncoder::encode_record(&quote).unwrap();
    let batch = RecordDecoder::default().decode(&msg).unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.get("INTC"), Some(&quote));
    assert!(batch.warnings().is_empty());
}

#[test]
fn test_two_symbols_bid_ask() {
    let a = Quote { bid: Some(10.5), ask: Some(10.75), ..Quote::new("AAPL") };
    let b = Quote { bid: Some(20.25), ask: Some(20.5), ..Quote::new("MSFT") };
    let msg = RecordEncoder::encode_message([&a, &b]).unwrap();
    assert_eq!(msg[0], STATUS_QUOTE);

    let batch = RecordDecoder::default().decode(&msg).unwrap();
    assert_eq!(batch.symbols(), vec!["AAPL", "MSFT"]);
    for quote in batch.iter() {
        assert_eq!(quote.present_fields(), vec![FieldCode::Bid, FieldCode::Ask]);
    }
    assert_eq!(batch.get("MSFT").unwrap().ask, Some(20.5));
}

#[test]
fn test_same_symbol_last_one_wins() {
    let first = Quote { bid: Some(1.0), ..Quote::new("A") };
    let other = Quote { bid: Some(5.0), ..Quote::new("B") };
    let second = Quote { ask: Some(2.0), ..Quote::new("A") };
    let msg = RecordEncoder::encode_message([&first, &other, &second]).unwrap();

    let batch = RecordDecoder::default().decode(&msg).unwrap();
    assert_eq!(batch.symbols(), vec!["A", "B"]);
    assert_eq!(batch.get("A"), Some(&second));
}

#[test]
fn test_declared_size_exceeds_buffer() {
    let mut msg = RecordEncoder::encode_record(&Quote { bid: Some(1.0), ..Quote::new("A") }).unwrap();
    msg[1..3].copy_from_slice(&500u16.to_be_bytes());

    let result = RecordDecoder::default().decode(&msg);
    assert!(matches!(result, Err(FeedError::InsufficientData { need: 500, .. })));
}

#[test]
fn test_unknown_field_code() {
    let mut msg = RecordEncoder::encode_record(&Quote { bid: Some(1.0), ..Quote::new("A") }).unwrap();
    // Code byte sits right after status(1) size(2) marker(2) pad(1) sym_len(2) "A".
    msg[9] = 42;

    let result = RecordDecoder::default().decode(&msg);
    assert!(matches!(result, Err(FeedError::UnknownFieldCode { code: 42, offset: 9 })));
}

#[test]
fn test_bad_terminator() {
    let mut msg = RecordEncoder::encode_record(&Quote { bid: Some(1.0), ..Quote::new("A") }).unwrap();
    let len = msg.len();
    msg[len - 1] = 0x2A;

    let result = RecordDecoder::default().decode(&msg);
    assert!(matches!(result, Err(FeedError::BadTerminator { found: 0xFF2A, .. })));
}

#[test]
fn test_bad_second_record_drops_whole_batch() {
    let good = RecordEncoder::encode_record(&Quote { bid: Some(1.0), ..Quote::new("A") }).unwrap();
    let mut bad = RecordEncoder::encode_record(&Quote { bid: Some(2.0), ..Quote::new("B") }).unwrap();
    let len = bad.len();
    bad[len - 2] = 0;
    let msg = [good, bad].concat();

    let result = RecordDecoder::default().decode(&msg);
    assert!(result.is_err());
    assert!(result.unwrap_err().is_structural());
}

#[test]
fn test_trailing_garbage_is_fatal() {
    let mut msg = RecordEncoder::encode_record(&Quote { bid: Some(1.0), ..Quote::new("A") }).unwrap();
    msg.push(STATUS_QUOTE);

    let result = RecordDecoder::default().decode(&msg);
    assert!(matches!(result, Err(FeedError::InsufficientData { .. })));
}

#[test]
fn test_marker_mismatch_warns() {
    let mut msg = RecordEncoder::encode_record(&Quote { ask: Some(3.5), ..Quote::new("A") }).unwrap();
    msg[3..5].copy_from_slice(&7u16.to_be_bytes());

    let batch = RecordDecoder::default().decode(&msg).unwrap();
    assert_eq!(batch.get("A").unwrap().ask, Some(3.5));
    assert_eq!(
        batch.warnings(),
        &[DecodeWarning::MarkerMismatch { found: 7, offset: 3 }]
    );
}

#[test]
fn test_marker_mismatch_rejected_when_strict() {
    let mut msg = RecordEncoder::encode_record(&Quote { ask: Some(3.5), ..Quote::new("A") }).unwrap();
    msg[3..5].copy_from_slice(&0u16.to_be_bytes());

    let decoder = RecordDecoder::new(DecoderOptions {
        marker_policy: ConsistencyPolicy::Reject,
        ..Default::default()
    });
    assert!(matches!(decoder.decode(&msg), Err(FeedError::BadMarker { found: 0 })));
}

#[test]
fn test_oversized_symbol_warns() {
    let quote = Quote { last: Some(12.0), ..Quote::new("BRK.B.X") };
    let msg = RecordEncoder::encode_record(&quote).unwrap();

    let batch = RecordDecoder::default().decode(&msg).unwrap();
    assert_eq!(batch.get("BRK.B.X"), Some(&quote));
    assert!(matches!(
        batch.warnings(),
        [DecodeWarning::SymbolTooLong { len: 7, max: 5, .. }]
    ));
}

#[test]
fn test_oversized_symbol_rejected_when_strict() {
    let msg = RecordEncoder::encode_record(&Quote::new("TOOLONG")).unwrap();
    let decoder = RecordDecoder::new(DecoderOptions {
        symbol_policy: ConsistencyPolicy::Reject,
        ..Default::default()
    });
    assert!(matches!(
        decoder.decode(&msg),
        Err(FeedError::SymbolTooLong { len: 7, max: 5 })
    ));
}

#[test]
fn test_reserved_fields_consume_nothing() {
    // Hand-built: symbol "A", codes 17 and 18, then a bid.
    let mut fields = vec![17u8, 18, 1];
    fields.extend_from_slice(&0.5f32.to_bits().to_be_bytes());
    let size = (2 + 1 + 2 + 1 + fields.len()) as u16;

    let mut msg = vec![STATUS_QUOTE];
    msg.extend_from_slice(&size.to_be_bytes());
    msg.extend_from_slice(&[0, 1, 0, 0, 1, b'A']);
    msg.extend_from_slice(&fields);
    msg.extend_from_slice(&TERMINATOR.to_be_bytes());

    let batch = RecordDecoder::default().decode(&msg).unwrap();
    assert_eq!(batch.get("A").unwrap().present_fields(), vec![FieldCode::Bid]);
    assert_eq!(batch.warnings().len(), 2);
}
