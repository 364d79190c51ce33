mod common;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::anyhow;
use common::*;
use mmg_testenv::prelude::*;

#[derive(Debug, PartialEq)]
struct MockLabel(&'static str);

#[tokio::test]
async fn suite_with_callback_starts_with_the_mock_and_stops_it() {
    let log = Log::default();
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("override core");
    let mock_log = log.clone();
    register_suite(
        &mut suite,
        DEFAULT_HOOK_TIMEOUT,
        Some(override_callback(move |ctx| {
            Box::pin(async move {
                ctx.insert(MockLabel("mock"));
                Ok(core_dep(FakeCore::new("mock", &mock_log)).into())
            })
        })),
    );

    let body_log = log.clone();
    let ctx = suite
        .run(&mut env, move |env, ctx| {
            Box::pin(async move {
                assert!(env.is_running());
                assert_eq!(ctx.get::<MockLabel>(), Some(&MockLabel("mock")));
                assert_eq!(body_log.entries().last().map(String::as_str), Some("start:mock"));
                Ok(())
            })
        })
        .await
        .expect("suite");

    assert!(!env.is_running());
    assert_eq!(ctx.get::<MockLabel>(), Some(&MockLabel("mock")));
    let entries = log.entries();
    assert_eq!(entries.last().map(String::as_str), Some("stop:mock"));
    assert!(!entries.iter().any(|e| e.ends_with(":real")));
}

#[tokio::test]
async fn suite_without_callback_starts_the_base_graph() {
    let log = Log::default();
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("plain");
    register_suite(&mut suite, env.config().hook_timeout, None);
    suite
        .run(&mut env, |env, _ctx| {
            Box::pin(async move {
                env.reset().await?;
                Ok(())
            })
        })
        .await
        .unwrap();
    let lifecycle: Vec<_> = log
        .entries()
        .into_iter()
        .filter(|e| !e.starts_with("set:"))
        .collect();
    assert_eq!(lifecycle, vec!["start:real", "stop:real"]);
}

#[tokio::test]
async fn callback_may_return_several_overrides() {
    let log = Log::default();
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("many");
    let cb_log = log.clone();
    register_suite(
        &mut suite,
        DEFAULT_HOOK_TIMEOUT,
        Some(override_callback(move |_ctx| {
            Box::pin(async move {
                Ok(vec![
                    core_dep(FakeCore::new("first", &cb_log)),
                    core_dep(FakeCore::new("second", &cb_log)),
                    Dependency::value("Probe", 1u8),
                ]
                .into())
            })
        })),
    );
    suite
        .run(&mut env, |env, _ctx| {
            Box::pin(async move {
                let graph = env.graph().expect("graph");
                assert!(graph.contains("Probe"));
                Ok(())
            })
        })
        .await
        .unwrap();
    let lifecycle: Vec<_> = log
        .entries()
        .into_iter()
        .filter(|e| !e.starts_with("set:"))
        .collect();
    assert_eq!(lifecycle, vec!["start:second", "stop:second"]);
}

#[tokio::test]
async fn after_hook_runs_when_the_body_fails() {
    let log = Log::default();
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("failing body");
    register_suite(&mut suite, DEFAULT_HOOK_TIMEOUT, None);
    let err = suite
        .run(&mut env, |_env, _ctx| {
            Box::pin(async move { Err(anyhow!("assertion failed")) })
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "assertion failed");
    assert!(!env.is_running());
    assert_eq!(log.entries().last().map(String::as_str), Some("stop:real"));
}

#[tokio::test]
async fn failing_callback_skips_body_and_after_is_a_no_op() {
    let log = Log::default();
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("bad callback");
    register_suite(
        &mut suite,
        DEFAULT_HOOK_TIMEOUT,
        Some(override_callback(|_ctx| {
            Box::pin(async move { Err(anyhow!("fixture file missing")) })
        })),
    );
    let ran = Arc::new(AtomicBool::new(false));
    let body_ran = ran.clone();
    let err = suite
        .run(&mut env, move |_env, _ctx| {
            Box::pin(async move {
                body_ran.store(true, Ordering::SeqCst);
                Ok(())
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TestEnvError>(),
        Some(TestEnvError::Hook(_))
    ));
    assert!(!ran.load(Ordering::SeqCst));
    assert!(log.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_startup_hits_the_hook_timeout() {
    let log = Log::default();
    let mut slow = FakeCore::new("slow", &log);
    slow.start_delay = Some(Duration::from_secs(60));
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("slow");
    register_suite(
        &mut suite,
        DEFAULT_HOOK_TIMEOUT,
        Some(override_callback(move |_ctx| {
            Box::pin(async move { Ok(core_dep(slow).into()) })
        })),
    );
    let err = suite
        .run(&mut env, |_env, _ctx| Box::pin(async move { Ok(()) }))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TestEnvError>(),
        Some(TestEnvError::HookTimeout(d)) if *d == DEFAULT_HOOK_TIMEOUT
    ));
    assert!(!env.is_running());
    assert_eq!(env.phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn phase_left_by_a_timed_out_start_is_cleared_by_stop_and_setup() {
    let log = Log::default();
    let mut slow = FakeCore::new("slow", &log);
    slow.start_delay = Some(Duration::from_secs(60));
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("slow, no teardown");
    register_before(
        &mut suite,
        Duration::from_secs(1),
        Some(override_callback(move |_ctx| {
            Box::pin(async move { Ok(core_dep(slow).into()) })
        })),
    );
    let err = suite
        .run(&mut env, |_env, _ctx| Box::pin(async move { Ok(()) }))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TestEnvError>(),
        Some(TestEnvError::HookTimeout(_))
    ));
    // 启动 future 在核心服务启动途中被丢弃
    assert_eq!(env.phase(), Phase::Starting);
    assert!(!env.is_running());

    env.stop().await.unwrap();
    assert_eq!(env.phase(), Phase::Idle);

    env.start(Overrides::none()).await.unwrap();
    assert_eq!(env.phase(), Phase::Running);
    env.stop().await.unwrap();
    assert_eq!(env.phase(), Phase::Idle);
}

#[tokio::test]
async fn hooks_can_be_registered_separately() {
    let log = Log::default();
    let mut env = TestEnvironment::new(base(&log));
    let mut suite = Suite::new("separate");
    register_before(&mut suite, Duration::from_secs(1), None);
    suite
        .run(&mut env, |_env, _ctx| Box::pin(async move { Ok(()) }))
        .await
        .unwrap();
    // 没有后置钩子，环境保持运行，由调用方负责停止
    assert!(env.is_running());

    let mut teardown = Suite::new("teardown");
    register_after(&mut teardown);
    teardown
        .run(&mut env, |_env, _ctx| Box::pin(async move { Ok(()) }))
        .await
        .unwrap();
    assert!(!env.is_running());
}
