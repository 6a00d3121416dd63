//! Stepping routines by hand
use setlist::{AsRoutine, Deferred, Driver, Handle, Routine, RoutineFn, Step, Yielded};
use std::{
    io::{Cursor, Read},
    sync::mpsc::channel,
    thread::spawn,
};

#[test]
fn routine_from_closure_works() {
    let mut routine = Routine::new(|handle: Handle<&'static str, ()>| async move {
        let reply = handle.yield_value(Yielded::Value("ping")).await?;
        assert_eq!(reply, "pong");
        Ok("done")
    });

    routine = match routine.resume() {
        Step::Pending(r, Yielded::Value(ping)) => {
            assert_eq!(ping, "ping");
            r.send("pong")
        }
        _ => panic!("expected a plain value"),
    };

    match routine.resume() {
        Step::Pending(_, _) => panic!("expected complete"),
        Step::Complete(res) => assert_eq!(res, Ok("done")),
    };
}

#[test]
fn thrown_failures_propagate_with_the_question_mark() {
    let routine = Routine::new(|handle: Handle<u8, &'static str>| async move {
        handle.yield_value(Yielded::Value(1)).await?;
        Ok(0)
    });

    let routine = match routine.resume() {
        Step::Pending(r, _) => r.throw("boom"),
        Step::Complete(_) => panic!("expected pending"),
    };

    match routine.resume() {
        Step::Pending(_, _) => panic!("expected complete"),
        Step::Complete(res) => assert_eq!(res, Err("boom")),
    };
}

#[test]
fn closures_capturing_owned_data_work() {
    let nums = vec![1, 2, 3];
    let mut routine = Routine::new(move |handle: Handle<usize, ()>| async move {
        let mut total = 0;
        for n in nums {
            let doubled = handle.yield_value(Yielded::Value(n)).await?;
            assert_eq!(doubled, n * 2);
            total += doubled;
        }

        Ok(total)
    });

    loop {
        routine = match routine.resume() {
            Step::Pending(r, Yielded::Value(n)) => r.send(n * 2),
            Step::Pending(_, y) => panic!("unexpected yield: {y:?}"),
            Step::Complete(res) => {
                assert_eq!(res, Ok(12));
                return;
            }
        };
    }
}

// Contrived but checking that we are able to pass a routine between threads and resume it
// without things exploding in any way.
#[test]
fn moving_between_threads() {
    let mut ping_pong = Routine::new(|handle: Handle<&'static str, ()>| async move {
        let mut s = "ping";
        for _ in 0..10 {
            s = handle.yield_value(Yielded::Value(s)).await?;
        }

        Ok(s)
    });

    let (tx1, rx1) = channel();
    let (tx2, rx2) = channel();

    let jh1 = spawn(move || {
        for _ in 0..3 {
            ping_pong = {
                match ping_pong.resume() {
                    Step::Pending(r, Yielded::Value(s)) => {
                        assert_eq!(s, "ping");
                        tx1.send(r.send("pong")).unwrap();
                        rx2.recv().unwrap()
                    }
                    _ => break,
                }
            };
        }
    });

    let jh2 = spawn(move || {
        for _ in 0..3 {
            let ping_pong = rx1.recv().unwrap();
            match ping_pong.resume() {
                Step::Pending(r, Yielded::Value(s)) => {
                    assert_eq!(s, "pong");
                    tx2.send(r.send("ping")).unwrap();
                }
                _ => break,
            }
        }
    });

    jh1.join().unwrap();
    jh2.join().unwrap();
}

#[test]
fn yield_from_forwards_inner_suspensions() {
    let inner = Routine::new(|handle: Handle<u32, ()>| async move {
        let a = handle.yield_value(Yielded::Value(1)).await?;
        handle.yield_value(Yielded::Value(a + 1)).await
    });

    let mut routine = Routine::new(move |handle: Handle<u32, ()>| async move {
        let n = handle.yield_from(inner).await?;
        handle.yield_value(Yielded::Value(n + 1)).await
    });

    let mut seen = Vec::new();
    let res = loop {
        routine = match routine.resume() {
            Step::Pending(r, Yielded::Value(n)) => {
                seen.push(n);
                r.send(n)
            }
            Step::Pending(_, y) => panic!("unexpected yield: {y:?}"),
            Step::Complete(res) => break res,
        };
    };

    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(res, Ok(3));
}

#[tokio::test]
async fn yield_from_resumes_a_routine_stepped_by_hand() {
    let inner = Routine::new(|handle: Handle<u32, ()>| async move {
        let n = handle.yield_value(Yielded::Value(0)).await?;
        let m = handle.yield_value(Deferred::resolved(100)).await?;
        Ok(n + m)
    });

    let inner = match inner.resume() {
        Step::Pending(r, Yielded::Value(0)) => r.send(5),
        _ => panic!("expected a plain value"),
    };

    let outer = Routine::new(move |handle: Handle<u32, ()>| async move {
        handle.yield_from(inner).await
    });

    let res = Driver::default().drive(outer).unwrap().await;

    assert_eq!(res, Ok(105));
}

#[test]
fn yield_from_hands_failures_to_the_inner_routine() {
    let inner = Routine::new(|handle: Handle<u32, &'static str>| async move {
        match handle.yield_value(Yielded::Value(1)).await {
            Ok(n) => Ok(n),
            Err(_) => Ok(7),
        }
    });

    let routine = Routine::new(move |handle: Handle<u32, &'static str>| async move {
        handle.yield_from(inner).await
    });

    let routine = match routine.resume() {
        Step::Pending(r, Yielded::Value(1)) => r.throw("boom"),
        _ => panic!("expected a plain value"),
    };

    match routine.resume() {
        Step::Pending(_, _) => panic!("expected complete"),
        Step::Complete(res) => assert_eq!(res, Ok(7)),
    };
}

#[test]
#[should_panic(expected = "a routine awaited a future other than those provided by Handle")]
fn handle_futures_cannot_be_waited_on() {
    let init = RoutineFn::new(|handle: Handle<u32, ()>| async move {
        handle
            .wait(async move { handle.yield_value(Yielded::Value(1)).await })
            .await
    });

    let deferred = Driver::default().drive(init).unwrap();
    let _ = futures::executor::block_on(deferred);
}

struct Answer;

impl AsRoutine for Answer {
    type Ok = u32;
    type Err = ();

    async fn run(handle: Handle<u32, ()>) -> Result<u32, ()> {
        let n = handle.yield_value(Deferred::resolved(21)).await?;
        Ok(n * 2)
    }
}

#[tokio::test]
async fn type_level_constructors_can_be_driven() {
    let driver = Driver::default();

    assert_eq!(driver.drive(Answer::constructor()).unwrap().await, Ok(42));
    assert_eq!(driver.drive(Answer::initialize()).unwrap().await, Ok(42));
}

// ["Hello", "世界"] in 9p wire format.
const HELLO_WORLD: [u8; 17] = [
    0x02, 0x00, 0x05, 0x00, 0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x06, 0x00, 0xe4, 0xb8, 0x96, 0xe7, 0x95,
    0x8c,
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Wire {
    Want(usize),
    Bytes(Vec<u8>),
    Strings(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum ParseError {
    #[error("unexpected reply: {0:?}")]
    Unexpected(Wire),
    #[error("invalid utf-8")]
    InvalidData,
    #[error("short read")]
    ShortRead,
}

async fn read_bytes(handle: Handle<Wire, ParseError>, n: usize) -> Result<Vec<u8>, ParseError> {
    match handle.yield_value(Yielded::Value(Wire::Want(n))).await? {
        Wire::Bytes(buf) if buf.len() == n => Ok(buf),
        other => Err(ParseError::Unexpected(other)),
    }
}

async fn read_9p_u16(handle: Handle<Wire, ParseError>) -> Result<u16, ParseError> {
    let buf = read_bytes(handle, size_of::<u16>()).await?;

    Ok(u16::from_le_bytes([buf[0], buf[1]]))
}

async fn read_9p_string(handle: Handle<Wire, ParseError>) -> Result<String, ParseError> {
    let len = read_9p_u16(handle).await? as usize;
    let buf = read_bytes(handle, len).await?;

    String::from_utf8(buf).map_err(|_| ParseError::InvalidData)
}

async fn read_9p_string_vec(handle: Handle<Wire, ParseError>) -> Result<Wire, ParseError> {
    let len = read_9p_u16(handle).await? as usize;
    let mut strings = Vec::with_capacity(len);
    for _ in 0..len {
        strings.push(read_9p_string(handle).await?);
    }

    Ok(Wire::Strings(strings))
}

fn parse(bytes: &[u8]) -> Result<Wire, ParseError> {
    let mut reader = Cursor::new(bytes.to_vec());
    let mut routine = Routine::new(read_9p_string_vec);

    loop {
        routine = match routine.resume() {
            Step::Complete(res) => return res,
            Step::Pending(suspended, Yielded::Value(Wire::Want(n))) => {
                let mut buf = vec![0; n];
                match reader.read_exact(&mut buf) {
                    Ok(()) => suspended.send(Wire::Bytes(buf)),
                    Err(_) => suspended.throw(ParseError::ShortRead),
                }
            }
            Step::Pending(_, y) => panic!("unexpected yield: {y:?}"),
        };
    }
}

#[test]
fn nested_async_fns_parse_9p() {
    let parsed = parse(&HELLO_WORLD);

    assert_eq!(
        parsed,
        Ok(Wire::Strings(vec!["Hello".to_string(), "世界".to_string()]))
    );
}

#[test]
fn short_reads_are_thrown_into_the_parser() {
    let parsed = parse(&HELLO_WORLD[..8]);

    assert_eq!(parsed, Err(ParseError::ShortRead));
}
