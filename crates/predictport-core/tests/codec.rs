use anyhow::Result;
use ndarray::{arr2, ArrayD, IxDyn};
use predictport_core::codec::{decode, encode, encode_native, encode_scalar, NativeArray};
use predictport_core::literal::parse;
use predictport_core::{CodecError, DType, Scalar, Shape, Tensor};

#[test]
fn float_vector_round_trips() -> Result<()> {
    let tensor = encode(&parse("float:[0.49465084, -0.29043096]")?)?;
    assert_eq!(tensor.dtype(), DType::F32);
    assert_eq!(tensor.shape().dims(), &[2]);
    assert_eq!(tensor.byte_len(), 8);

    let values = decode(&tensor)?;
    assert_eq!(
        values,
        vec![Scalar::Float(0.494_650_84), Scalar::Float(-0.290_430_96)]
    );
    Ok(())
}

#[test]
fn every_numeric_tag_round_trips() -> Result<()> {
    let cases = [
        ("int:[[1,-2],[3,4]]", vec![Scalar::Int(1), Scalar::Int(-2), Scalar::Int(3), Scalar::Int(4)]),
        ("long:[9007199254740993]", vec![Scalar::Long(9_007_199_254_740_993)]),
        ("double:[5.0161824226379395,-4.023891925811768]", vec![
            Scalar::Double(5.016_182_422_637_939_5),
            Scalar::Double(-4.023_891_925_811_768),
        ]),
    ];
    for (literal, expected) in cases {
        assert_eq!(decode(&encode(&parse(literal)?)?)?, expected, "{literal}");
    }
    Ok(())
}

#[test]
fn scalar_literal_uses_scalar_tensor() -> Result<()> {
    let tensor = encode(&parse("double:0.5")?)?;
    assert_eq!(tensor.shape().rank(), 0);
    assert_eq!(tensor.bytes, Tensor::scalar_f64(0.5).bytes);
    assert_eq!(decode(&tensor)?, vec![Scalar::Double(0.5)]);
    Ok(())
}

#[test]
fn bad_token_names_value_and_type() -> Result<()> {
    let err = encode(&parse("int:[1,2.5]")?).unwrap_err();
    assert_eq!(
        err,
        CodecError::ValueFormat {
            token: "2.5".to_string(),
            expected: DType::I32,
        }
    );
    assert_eq!(err.to_string(), "value `2.5` is not a valid int32");
    Ok(())
}

#[test]
fn native_arrays_flatten_in_logical_order() -> Result<()> {
    // A transposed view is column-major in memory.
    let matrix = arr2(&[[1i64, 2, 3], [4, 5, 6]]).reversed_axes().into_dyn();
    let tensor = encode_native(&NativeArray::I64(matrix));
    assert_eq!(tensor.shape().dims(), &[3, 2]);
    let values = decode(&tensor)?;
    let expected: Vec<Scalar> = [1, 4, 2, 5, 3, 6].into_iter().map(Scalar::Long).collect();
    assert_eq!(values, expected);
    Ok(())
}

#[test]
fn native_bool_and_u8_arrays() -> Result<()> {
    let flags = ArrayD::from_shape_vec(IxDyn(&[3]), vec![true, false, true])?;
    let values = decode(&encode_native(&NativeArray::Bool(flags)))?;
    assert_eq!(values, vec![Scalar::Bool(true), Scalar::Bool(false), Scalar::Bool(true)]);

    let pixels = ArrayD::from_shape_vec(IxDyn(&[2]), vec![0u8, 255])?;
    let values = decode(&encode_native(&NativeArray::U8(pixels)))?;
    assert_eq!(values, vec![Scalar::Int(0), Scalar::Int(255)]);
    Ok(())
}

#[test]
fn encode_scalar_matches_type() -> Result<()> {
    assert_eq!(encode_scalar(&Scalar::Int(7)).dtype(), DType::I32);
    assert_eq!(encode_scalar(&Scalar::Bool(true)).dtype(), DType::Bool);
    let text = encode_scalar(&Scalar::String("abc".into()));
    assert_eq!(text.dtype(), DType::String);
    assert_eq!(decode(&text)?, vec![Scalar::String("abc".into())]);
    Ok(())
}

#[test]
fn bool_bytes_other_than_one_decode_false() -> Result<()> {
    let tensor = Tensor::from_cpu_bytes(
        DType::Bool,
        Shape::from_slice(&[3]),
        bytes::Bytes::from_static(&[1, 0, 2]),
    );
    assert_eq!(
        decode(&tensor)?,
        vec![Scalar::Bool(true), Scalar::Bool(false), Scalar::Bool(false)]
    );
    Ok(())
}

#[test]
fn text_buffer_decodes_to_one_string() -> Result<()> {
    let tensor = Tensor::from_cpu_bytes(
        DType::String,
        Shape::from_slice(&[2]),
        bytes::Bytes::from_static(b"helloworld"),
    );
    assert_eq!(decode(&tensor)?, vec![Scalar::String("helloworld".into())]);
    Ok(())
}

#[test]
fn invalid_utf8_text_is_replaced_not_rejected() -> Result<()> {
    let tensor = Tensor::from_cpu_bytes(
        DType::String,
        Shape::from_slice(&[1]),
        bytes::Bytes::from_static(&[b'o', b'k', 0xff, b'!']),
    );
    assert_eq!(
        decode(&tensor)?,
        vec![Scalar::String("ok\u{FFFD}!".to_string())]
    );
    Ok(())
}

#[test]
fn truncated_buffer_is_rejected() {
    let tensor = Tensor::from_cpu_bytes(
        DType::F32,
        Shape::from_slice(&[2]),
        bytes::Bytes::from_static(&[0, 0, 0, 0, 0, 0]),
    );
    assert_eq!(
        decode(&tensor).unwrap_err(),
        CodecError::ByteLength {
            dtype: DType::F32,
            len: 6,
        }
    );
}

#[test]
fn buffer_shorter_than_shape_is_rejected() {
    let tensor = Tensor::from_cpu_bytes(
        DType::I32,
        Shape::from_slice(&[2, 2]),
        bytes::Bytes::from_static(&[1, 0, 0, 0]),
    );
    assert!(matches!(
        decode(&tensor),
        Err(CodecError::ElementCount { found: 1, .. })
    ));
}
