// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};

/// Default priority for the audio callback thread when MLOOP_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

fn env_priority(name: &str) -> Option<ThreadPriorityValue> {
    std::env::var(name).ok().and_then(|v| {
        let n = v.trim().parse::<u8>().ok()?;
        (n < 100).then(|| ThreadPriorityValue::try_from(n).ok())?
    })
}

/// Reads MLOOP_THREAD_PRIORITY (0-99). Called once when building the callback so the
/// hot path never touches the environment.
pub fn callback_thread_priority() -> Option<ThreadPriorityValue> {
    env_priority("MLOOP_THREAD_PRIORITY")
        .or_else(|| ThreadPriorityValue::try_from(DEFAULT_CALLBACK_THREAD_PRIORITY).ok())
}

/// Reads MLOOP_WORKER_PRIORITY (0-99). Workers keep the default priority when unset.
pub fn worker_thread_priority() -> Option<ThreadPriorityValue> {
    env_priority("MLOOP_WORKER_PRIORITY")
}

pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the audio callback thread.
/// Default: enabled. Opt out with MLOOP_DISABLE_RT_AUDIO=1.
pub fn rt_audio_enabled() -> bool {
    !env_flag("MLOOP_DISABLE_RT_AUDIO")
}

/// Raises the calling thread's priority, optionally with SCHED_FIFO. Never logs, so it
/// is safe to call from the audio callback. Returns whether RT scheduling was applied.
pub fn configure_thread_priority(priority: ThreadPriorityValue, realtime: bool) -> bool {
    let tp = ThreadPriority::Crossplatform(priority);
    let _ = set_current_thread_priority(tp);

    #[cfg(unix)]
    if realtime {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        return set_thread_priority_and_policy(
            thread_native_id(),
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        )
        .is_ok();
    }

    #[cfg(not(unix))]
    let _ = realtime;
    false
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_worker_priority_from_env() {
        std::env::remove_var("MLOOP_WORKER_PRIORITY");
        assert!(worker_thread_priority().is_none());

        std::env::set_var("MLOOP_WORKER_PRIORITY", "40");
        assert_eq!(
            worker_thread_priority(),
            ThreadPriorityValue::try_from(40u8).ok()
        );

        std::env::set_var("MLOOP_WORKER_PRIORITY", "140");
        assert!(worker_thread_priority().is_none());

        std::env::remove_var("MLOOP_WORKER_PRIORITY");
    }

    #[test]
    #[serial]
    fn test_callback_priority_default() {
        std::env::remove_var("MLOOP_THREAD_PRIORITY");
        assert_eq!(
            callback_thread_priority(),
            ThreadPriorityValue::try_from(DEFAULT_CALLBACK_THREAD_PRIORITY).ok()
        );

        std::env::set_var("MLOOP_THREAD_PRIORITY", "not a number");
        assert_eq!(
            callback_thread_priority(),
            ThreadPriorityValue::try_from(DEFAULT_CALLBACK_THREAD_PRIORITY).ok()
        );
        std::env::remove_var("MLOOP_THREAD_PRIORITY");
    }

    #[test]
    #[serial]
    fn test_rt_audio_flag() {
        std::env::set_var("MLOOP_DISABLE_RT_AUDIO", "yes");
        assert!(!rt_audio_enabled());
        std::env::remove_var("MLOOP_DISABLE_RT_AUDIO");
        assert!(rt_audio_enabled());
    }
}
