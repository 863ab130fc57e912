#![cfg(test)]
use super::error::Error;
use super::record::{Record, Value};
use super::vclock::{Format, VectorClocks};
use hex_literal::hex;

// Fixtures captured from a queue fed with the corresponding puts/deletes.

const NORMAL_PUT: &[u8] = &hex!(
    "0100aec7664b1000000000000000047465737400000004746573743501000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a0000000100000011017b2274657374223a226461746134227d0000004a00
     000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949754162
     6b46000000000d01636f6e74656e742d7479706500000011016170706c696361
     74696f6e2f6a736f6e"
);

const COMPRESSED_PUT: &[u8] = &hex!(
    "010069f66110180000000000000004746573740000000474657374789c336564
     6060706cce01924c194cb9408a633fc3c2f70cbfadd532981299f25819ca653e
     dde48348f140a47cde01d98c50e9b5b240e92c9000100b32562b95a416972859
     29a52496249a28d502053d1918d88218f8cdd733f098ed154d35340c3371af34
     2e4b2ef077f20cf32c0dcecd4e05aa62e0654ccecf2b49cd2bd12da92c48051b
     9658509093999c5892999fa79f559c9f0700acec2deb"
);

const BUCKET_TYPE_PUT: &[u8] = &hex!(
    "0100d60fd7fb100000000874657374547970650000000a746573744275636b65
     7400000007746573744b6579350100000041836c0000000268026d00000008bf
     00a1ef00fb3b26680261026e0500771cf2d90e68026d0000000cbf00a1ef00fb
     4cee00000001680261026e0500ad1df2d90e6a0000000100000010017b227465
     7374223a2264617461227d0000004a00000652000f3edc0007331816354e6e4f
     456541586d52597563526b486c384b455879000000000d01636f6e74656e742d
     7479706500000011016170706c69636174696f6e2f6a736f6e"
);

const DELETE: &[u8] = &hex!(
    "010100000041836c0000000268026d00000008bf00a1ef00fb3b26680261026e
     0500771cf2d90e68026d0000000cbf00a1ef00fb4cee00000001680261036e05
     00d528f2d90e6ae95a85ab100000000000000004746573740000000474657374
     350100000041836c0000000268026d00000008bf00a1ef00fb3b26680261026e
     0500771cf2d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e05
     00ad1df2d90e6a0000000100000001010000000e00000652000ce97800000001
     0001"
);

const BAD_CHECKSUM: &[u8] = &hex!(
    "0100aec799b41000000000000000047465737400000004746573743501000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a0000000100000011017b2274657374223a226461746134227d0000004a00
     000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949754162
     6b46000000000d01636f6e74656e742d7479706500000011016170706c696361
     74696f6e2f6a736f6e"
);

const BAD_MAGIC: &[u8] = &hex!(
    "01001d1addfd1000000000000000047465737400000004746573743601000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a0000000100000011017b2274657374223a226461746134227d0000004a00
     000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949754162
     6b46000000000d01636f6e74656e742d7479706500000011016170706c696361
     74696f6e2f6a736f6e"
);

const TRAILING_BYTE: &[u8] = &hex!(
    "0100ba719b131000000000000000047465737400000004746573743501000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a0000000100000011017b2274657374223a226461746134227d0000004a00
     000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949754162
     6b46000000000d01636f6e74656e742d7479706500000011016170706c696361
     74696f6e2f6a736f6e99"
);

const TWO_SIBLINGS: &[u8] = &hex!(
    "0100ee5fbf2c1000000000000000047465737400000004746573743501000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a0000000200000011017b2274657374223a226461746134227d0000004a00
     000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949754162
     6b46000000000d01636f6e74656e742d7479706500000011016170706c696361
     74696f6e2f6a736f6e00000011017b2274657374223a226461746134227d0000
     004a00000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949
     7541626b46000000000d01636f6e74656e742d7479706500000011016170706c
     69636174696f6e2f6a736f6e"
);

const BAD_VERSION: &[u8] = &hex!(
    "01001506feb31000000000000000047465737400000004746573743502000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a0000000100000011017b2274657374223a226461746134227d0000004a00
     000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949754162
     6b46000000000d01636f6e74656e742d7479706500000011016170706c696361
     74696f6e2f6a736f6e"
);

const BAD_COMPRESSION_FLAG: &[u8] = &hex!(
    "0100fd5ccb7c6300000000000000047465737400000004746573743501000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a0000000100000011017b2274657374223a226461746134227d0000004a00
     000652000ce92d0001ee5a16356b7a6d6378527054647451466c304949754162
     6b46000000000d01636f6e74656e742d7479706500000011016170706c696361
     74696f6e2f6a736f6e"
);

const TERM_PAYLOADS_PUT: &[u8] = &hex!(
    "0100ee57309d1000000000000000047465737400000004746573743501000000
     41836c0000000268026d00000008bf00a1ef00fb3b26680261026e0500771cf2
     d90e68026d0000000cbf00a1ef00fb4cee00000001680261026e0500ad1df2d9
     0e6a000000010000001700836d000000107b2274657374223a22646174613422
     7d0000005b00000652000ce92d0001ee5a16356b7a6d6378527054647451466c
     3049497541626b46000000000d01636f6e74656e742d74797065000000110161
     70706c69636174696f6e2f6a736f6e0000000601696e6465780000000300836a"
);

const NULL_FIELDS_PUT: &[u8] = &hex!(
    "0100a9a4146110000000000000000000000000350100000041836c0000000268
     026d00000008bf00a1ef00fb3b26680261026e0500771cf2d90e68026d000000
     0cbf00a1ef00fb4cee00000001680261026e0500ad1df2d90e6a000000010000
     000201780000000e00000652000ce92d0001ee5a0000"
);

const VCLOCK_B64: &str =
    "g2wAAAACaAJtAAAACL8Aoe8A+zsmaAJhAm4FAHcc8tkOaAJtAAAADL8Aoe8A+0zuAAAAAWgCYQJuBQCtHfLZDmo=";

const TOMB_CLOCK_B64: &str =
    "g2wAAAACaAJtAAAACL8Aoe8A+zsmaAJhAm4FAHcc8tkOaAJtAAAADL8Aoe8A+0zuAAAAAWgCYQNuBQDVKPLZDmo=";

fn parse(data: &[u8]) -> Record {
    Record::parse(data, Format::Base64).unwrap()
}

fn binary(data: &[u8]) -> Value {
    Value::Binary(data.to_vec().into())
}

#[test]
fn normal_put() {
    let rec = parse(NORMAL_PUT);

    assert!(!rec.empty);
    assert_eq!(rec.crc, 2932303435);
    assert!(!rec.is_delete);
    assert!(!rec.compressed);
    assert_eq!(rec.bucket_type, None);
    assert_eq!(rec.bucket.as_deref(), Some(b"test".as_slice()));
    assert_eq!(rec.key.as_deref(), Some(b"test".as_slice()));
    assert_eq!(
        rec.vector_clocks,
        Some(VectorClocks::Base64(VCLOCK_B64.to_string()))
    );
    assert_eq!(rec.siblings_count, 1);
    assert!(!rec.head_only);
    assert_eq!(rec.value, Some(binary(b"{\"test\":\"data4\"}")));
    assert_eq!(rec.last_modified.as_deref(), Some("1618846125.126554"));
    assert_eq!(rec.vtag.as_deref(), Some(b"5kzmcxRpTdtQFl0IIuAbkF".as_slice()));
    assert!(!rec.key_deleted);
    assert_eq!(
        rec.metadata,
        vec![(binary(b"content-type"), binary(b"application/json"))]
    );
    assert!(rec.has_metadata(b"content-type", b"application/json"));
    assert!(!rec.has_metadata(b"content-type", b"text/plain"));
}

#[test]
fn normal_put_dict_clocks() {
    let rec = Record::parse(NORMAL_PUT, Format::Dict).unwrap();

    let Some(VectorClocks::Dict(clocks)) = &rec.vector_clocks else {
        panic!("expected dict clocks, got {:?}", rec.vector_clocks);
    };
    assert_eq!(clocks.len(), 2);
    assert_eq!(clocks.get("1090001219101612390251762380001"), Some(&2));
    assert_eq!(clocks.get("1090008191016123902515938"), Some(&2));
}

#[test]
fn format_names() {
    assert_eq!("base64".parse::<Format>().unwrap(), Format::Base64);
    assert_eq!("dict".parse::<Format>().unwrap(), Format::Dict);
    assert!(matches!(
        "invalid".parse::<Format>(),
        Err(Error::InvalidFormat(v)) if v == "invalid"
    ));
}

#[test]
fn empty_queue_marker() {
    let rec = parse(&hex!("00"));
    assert!(rec.empty);
    assert_eq!(
        rec,
        Record {
            empty: true,
            ..Record::default()
        }
    );
}

#[test]
fn delete() {
    let rec = parse(DELETE);

    assert!(!rec.empty);
    assert!(rec.is_delete);
    assert_eq!(rec.tomb_clock.as_deref(), Some(TOMB_CLOCK_B64));
    assert!(rec.head_only);
    assert_eq!(rec.bucket_type, None);
    assert_eq!(rec.bucket.as_deref(), Some(b"test".as_slice()));
    assert_eq!(rec.key.as_deref(), Some(b"test".as_slice()));
    assert_eq!(rec.value, Some(binary(b"")));
    assert_eq!(rec.last_modified.as_deref(), Some("1618846200.1"));
    assert_eq!(rec.vtag.as_deref(), Some(b"".as_slice()));
    assert!(rec.key_deleted);
    assert!(rec.metadata.is_empty());
}

#[test]
fn compressed_put() {
    let rec = parse(COMPRESSED_PUT);

    assert!(!rec.empty);
    assert_eq!(rec.crc, 1777754384);
    assert!(!rec.is_delete);
    assert!(rec.compressed);
    assert_eq!(rec.bucket_type, None);
    assert_eq!(rec.bucket.as_deref(), Some(b"test".as_slice()));
    assert_eq!(rec.key.as_deref(), Some(b"test".as_slice()));
    assert_eq!(rec.value, Some(binary(b"{\"test\":\"data4\"}")));
    assert_eq!(rec.last_modified.as_deref(), Some("1618997295.800445"));
    assert_eq!(rec.vtag.as_deref(), Some(b"e11V4Gy3vcpOBIVIuSmke".as_slice()));
}

#[test]
fn put_with_bucket_type() {
    let rec = parse(BUCKET_TYPE_PUT);

    assert_eq!(rec.crc, 3591362555);
    assert_eq!(rec.bucket_type.as_deref(), Some(b"testType".as_slice()));
    assert_eq!(rec.bucket.as_deref(), Some(b"testBucket".as_slice()));
    assert_eq!(rec.key.as_deref(), Some(b"testKey".as_slice()));
    assert_eq!(rec.value, Some(binary(b"{\"test\":\"data\"}")));
    assert_eq!(rec.last_modified.as_deref(), Some("1618999132.471832"));
    assert_eq!(rec.vtag.as_deref(), Some(b"5NnOEeAXmRYucRkHl8KEXy".as_slice()));
}

#[test]
fn term_payloads() {
    use replsink_eterm::decode::Term;

    let rec = parse(TERM_PAYLOADS_PUT);

    assert_eq!(
        rec.value,
        Some(Value::Term(Term::Binary(
            b"{\"test\":\"data4\"}".to_vec().into()
        )))
    );
    assert_eq!(rec.metadata.len(), 2);
    assert_eq!(
        rec.metadata[1],
        (binary(b"index"), Value::Term(Term::List(Vec::new())))
    );
}

#[test]
fn null_length_fields() {
    let rec = parse(NULL_FIELDS_PUT);

    assert_eq!(rec.bucket_type, None);
    assert_eq!(rec.bucket, None);
    assert_eq!(rec.key, None);
    assert_eq!(rec.value, Some(binary(b"x")));
    assert_eq!(rec.vtag.as_deref(), Some(b"".as_slice()));
}

#[test]
fn invalid_checksum() {
    assert!(matches!(
        Record::parse(BAD_CHECKSUM, Format::Base64),
        Err(Error::InvalidChecksum {
            stored: 2932316596,
            computed: 2932303435,
        })
    ));
}

#[test]
fn corruption_is_detected() {
    // Flipping any byte in the checksummed region fails the parse
    for position in [6, 20, NORMAL_PUT.len() - 1] {
        let mut data = NORMAL_PUT.to_vec();
        data[position] ^= 0xff;
        assert!(
            matches!(
                Record::parse(&data, Format::Base64),
                Err(Error::InvalidChecksum { .. })
            ),
            "mutation at {position} went undetected"
        );
    }
}

#[test]
fn invalid_magic() {
    assert!(matches!(
        Record::parse(BAD_MAGIC, Format::Base64),
        Err(Error::InvalidMagic(54))
    ));
}

#[test]
fn unsupported_version() {
    assert!(matches!(
        Record::parse(BAD_VERSION, Format::Base64),
        Err(Error::UnsupportedVersion(2))
    ));
}

#[test]
fn invalid_compression_flag() {
    assert!(matches!(
        Record::parse(BAD_COMPRESSION_FLAG, Format::Base64),
        Err(Error::InvalidCompressionFlag(99))
    ));
}

#[test]
fn too_many_siblings() {
    assert!(matches!(
        Record::parse(TWO_SIBLINGS, Format::Base64),
        Err(Error::TooManySiblings(2))
    ));
}

#[test]
fn trailing_bytes() {
    assert!(matches!(
        Record::parse(TRAILING_BYTE, Format::Base64),
        Err(Error::TrailingBytes(1))
    ));
}

#[test]
fn truncated_input() {
    assert!(matches!(
        Record::parse(&[], Format::Base64),
        Err(Error::Truncated { need: 1, have: 0 })
    ));
    assert!(matches!(
        Record::parse(&hex!("0100"), Format::Base64),
        Err(Error::Truncated { need: 4, have: 0 })
    ));
    // A shortened blob fails its checksum before any field read
    assert!(matches!(
        Record::parse(&NORMAL_PUT[..NORMAL_PUT.len() - 40], Format::Base64),
        Err(Error::InvalidChecksum { .. })
    ));
}
