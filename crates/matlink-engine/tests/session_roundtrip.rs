//! End-to-end session tests against the in-process engine double.
//!
//! Every property here runs the real session, marshalling, and handle
//! machinery; only the engine itself is the mock.

use std::ffi::CString;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use indexmap::IndexMap;
use matlink_arrays::{Complex, DType, NumericArray, Value};
use matlink_engine::class::ClassId;
use matlink_engine::error::EngineError;
use matlink_engine::mock::MockEngine;
use matlink_engine::session::{Session, SessionOptions};
use matlink_engine::{EngApi, MxApi};

const COMMAND: &str = "/opt/matlab/bin/matlab -nosplash";

fn connect(mock: &Arc<MockEngine>) -> Session {
    Session::connect(mock.api(), &SessionOptions::new(COMMAND)).unwrap()
}

/// Put a value, get it back, and assert no handle leaked on the way.
fn roundtrip(value: &Value) -> Value {
    let mock = MockEngine::new();
    let mut session = connect(&mock);
    session.put("v", value).unwrap();
    let out = session.get("v").unwrap();
    assert_eq!(mock.live_handles(), 0, "handle leaked during roundtrip");
    out
}

#[test]
fn test_roundtrip_1d_squeezes_padded_dim() {
    let value = Value::from_vec(&[1.0f64, 2.0, 3.0, 4.0, 5.0], vec![5]).unwrap();
    // Padded to 1x5 on the way in, squeezed back to 5 on the way out.
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_roundtrip_2d_preserves_layout() {
    // Distinct values so a row/column-major inversion cannot cancel out.
    let value = Value::from_vec(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
    let out = roundtrip(&value);
    let array = out.as_array().unwrap();
    assert_eq!(array.shape(), &[2, 3]);
    assert_eq!(
        array.to_vec::<f64>().unwrap(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
}

#[test]
fn test_roundtrip_3d_with_interior_unit_dim() {
    let elems: Vec<f64> = (0..8).map(f64::from).collect();
    let value = Value::from_vec(&elems, vec![2, 1, 4]).unwrap();
    let out = roundtrip(&value);
    let array = out.as_array().unwrap();
    // Squeeze drops the interior unit dim; linear order is unchanged.
    assert_eq!(array.shape(), &[2, 4]);
    assert_eq!(array.to_vec::<f64>().unwrap(), elems);
}

#[test]
fn test_roundtrip_3d() {
    let elems: Vec<i32> = (0..24).collect();
    let value = Value::from_vec(&elems, vec![2, 3, 4]).unwrap();
    let out = roundtrip(&value);
    let array = out.as_array().unwrap();
    assert_eq!(array.shape(), &[2, 3, 4]);
    assert_eq!(array.to_vec::<i32>().unwrap(), elems);
}

#[test]
fn test_roundtrip_every_real_dtype() {
    fn check<T: matlink_arrays::Element>(values: &[T]) {
        let value = Value::from_vec(values, vec![values.len()]).unwrap();
        let out = roundtrip(&value);
        let array = out.as_array().unwrap();
        assert_eq!(array.dtype(), T::dtype());
        assert_eq!(array.to_vec::<T>().unwrap(), values.to_vec());
    }

    check::<i8>(&[-1, 0, 127]);
    check::<i16>(&[-300, 0, 300]);
    check::<i32>(&[-70_000, 0, 70_000]);
    check::<i64>(&[i64::MIN, 0, i64::MAX]);
    check::<u8>(&[0, 128, 255]);
    check::<u16>(&[0, 40_000, u16::MAX]);
    check::<u32>(&[0, 3_000_000_000, u32::MAX]);
    check::<u64>(&[0, u64::MAX / 2, u64::MAX]);
    check::<f32>(&[-1.5, 0.0, 1.5]);
}

#[test]
fn test_roundtrip_scalar() {
    let out = roundtrip(&Value::from(6.25f64));
    let array = out.as_array().unwrap();
    // A 1x1 engine array decodes to a zero-dim scalar.
    assert_eq!(array.shape(), &[] as &[usize]);
    assert_eq!(out.as_scalar::<f64>(), Some(6.25));
}

#[test]
fn test_complex_roundtrip() {
    let values = [
        Complex::new(1.0f64, -4.0),
        Complex::new(2.0, 5.0),
        Complex::new(-3.0, 6.0),
        Complex::new(0.25, -0.75),
    ];
    let value = Value::from_vec(&values, vec![2, 2]).unwrap();
    let out = roundtrip(&value);
    let array = out.as_array().unwrap();
    assert_eq!(array.dtype(), DType::Complex128);
    assert_eq!(array.shape(), &[2, 2]);
    assert_eq!(array.to_vec::<Complex<f64>>().unwrap(), values.to_vec());
}

#[test]
fn test_string_roundtrip() {
    let out = roundtrip(&Value::from("hello, workspace"));
    assert_eq!(out, Value::from("hello, workspace"));

    let empty = roundtrip(&Value::from(""));
    assert_eq!(empty, Value::from(""));
}

#[test]
fn test_logical_roundtrip_keeps_bool_dtype() {
    let value = Value::from_vec(&[true, false, true, true], vec![2, 2]).unwrap();
    let out = roundtrip(&value);
    let array = out.as_array().unwrap();
    assert_eq!(array.dtype(), DType::Bool);
    assert_eq!(array.shape(), &[2, 2]);
    assert_eq!(array.to_vec::<bool>().unwrap(), vec![true, false, true, true]);
}

#[test]
fn test_eval_success_does_not_raise() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);
    session.eval("x = 1 + 1;").unwrap();
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_eval_wraps_expression_in_capture_template() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);
    session.eval("y = magic(4);").unwrap();

    let scripts = mock.scripts();
    let script = scripts.last().unwrap();
    assert!(script.starts_with("ERRORSTR = '';"));
    assert!(script.contains("y = magic(4);"));
    assert!(script.contains("catch err"));
    assert!(script.contains("if exist('ERRORSTR','var') == 0"));
}

#[test]
fn test_eval_error_surfaces_identifier_and_message() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);

    let report = "MATLAB:UndefinedFunction: Undefined function 'nope'.\n\
                  Error: in function caller in file caller.m line 12\n";
    mock.fail_next_eval(report);

    let err = session.eval("nope();").unwrap_err();
    match &err {
        EngineError::Evaluation { report: captured } => {
            assert!(captured.contains("MATLAB:UndefinedFunction"));
            assert!(captured.contains("Undefined function 'nope'."));
            assert!(captured.contains("caller.m line 12"));
        }
        other => panic!("expected Evaluation error, got {other:?}"),
    }
    assert_eq!(mock.live_handles(), 0);

    // The session stays usable after a script error.
    session.eval("x = 1;").unwrap();
}

#[test]
fn test_whitespace_only_capture_counts_as_success() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);
    mock.fail_next_eval("  \n\t");
    session.eval("x = 1;").unwrap();
}

#[test]
fn test_struct_encode_rejected_without_touching_workspace() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);

    let mut fields = IndexMap::new();
    fields.insert("a".to_string(), Value::from(1.0f64));
    let err = session.put("s", &Value::Struct(fields)).unwrap_err();

    assert_eq!(
        err,
        EngineError::UnsupportedType {
            dtype: "struct".to_string()
        }
    );
    assert!(!mock.has_variable("s"));
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_get_missing_variable_fails() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);

    let err = session.get("never_assigned").unwrap_err();
    assert_eq!(
        err,
        EngineError::VariableNotFound {
            name: "never_assigned".to_string()
        }
    );
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_get_unsupported_class_destroys_handle() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);

    // Plant a cell array in the workspace through the raw binding surface.
    let ep = mock.open(&CString::new(COMMAND).unwrap());
    let pm = mock.create_numeric(&[1, 1], ClassId::Cell, false);
    let name = CString::new("c").unwrap();
    assert_eq!(mock.put_variable(ep, &name, pm), 0);
    mock.destroy(pm);
    mock.close(ep);

    let err = session.get("c").unwrap_err();
    assert_eq!(
        err,
        EngineError::UnsupportedClass {
            class: "cell".to_string()
        }
    );
    // The handle fetched for decoding was destroyed on the failure path.
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_put_failure_still_destroys_handle() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);
    mock.fail_next_put();

    let err = session
        .put("x", &Value::from(1.0f64))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::PutFailed {
            name: "x".to_string()
        }
    );
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_handle_balance_over_many_calls() {
    let mock = MockEngine::new();
    let mut session = connect(&mock);

    for i in 0..10 {
        let value = Value::from_vec(&[i as f64, 2.0 * i as f64], vec![2]).unwrap();
        session.put("x", &value).unwrap();
        session.get("x").unwrap();
        session.eval("x = x + 1;").unwrap();
    }

    assert_eq!(mock.live_handles(), 0);
    assert_eq!(mock.created(), mock.destroyed());
}

#[test]
fn test_connection_failure_names_command() {
    let mock = MockEngine::new();
    mock.refuse_connections();

    let err = Session::connect(mock.api(), &SessionOptions::new(COMMAND)).unwrap_err();
    assert_eq!(
        err,
        EngineError::ConnectionFailure {
            command: COMMAND.to_string()
        }
    );
    assert!(err.to_string().contains(COMMAND));
}

#[test]
fn test_output_capture() {
    let mock = MockEngine::new();
    let options = SessionOptions::new(COMMAND).with_output_capacity(64);
    let mut session = Session::connect(mock.api(), &options).unwrap();

    mock.queue_output("ans =\n     2\n");
    session.eval("1 + 1").unwrap();
    assert_eq!(session.output(), Some("ans =\n     2\n".to_string()));
}

#[test]
fn test_output_capture_truncates_at_capacity() {
    let mock = MockEngine::new();
    let options = SessionOptions::new(COMMAND).with_output_capacity(8);
    let mut session = Session::connect(mock.api(), &options).unwrap();

    mock.queue_output("0123456789abcdef");
    session.eval("x = 0;").unwrap();
    // Capacity 8 leaves room for 7 bytes plus the terminator.
    assert_eq!(session.output(), Some("0123456".to_string()));
}

#[test]
fn test_output_is_none_without_buffer() {
    let mock = MockEngine::new();
    let session = connect(&mock);
    assert_eq!(session.output(), None);
}

#[test]
fn test_close_is_exact_once() {
    let mock = MockEngine::new();
    let session = connect(&mock);
    assert_eq!(mock.open_connections(), 1);

    // Explicit close; the mock panics if drop closed a second time.
    session.close();
    assert_eq!(mock.open_connections(), 0);

    // Drop-only teardown closes too.
    let dropped = connect(&mock);
    drop(dropped);
    assert_eq!(mock.open_connections(), 0);
}

#[test]
fn test_roundtrip_1x5_squeezes_to_vector() {
    let value = NumericArray::from_vec(&[9.0f64, 8.0, 7.0, 6.0, 5.0], vec![1, 5]).unwrap();
    let out = roundtrip(&Value::Array(value));
    let array = out.as_array().unwrap();
    // (1, 5) comes back squeezed to (5,).
    assert_eq!(array.shape(), &[5]);
    assert_eq!(array.to_vec::<f64>().unwrap(), vec![9.0, 8.0, 7.0, 6.0, 5.0]);
}
