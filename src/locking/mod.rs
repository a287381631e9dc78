// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod acquisition;
pub mod cancellation;
pub mod clock;
mod owner;
pub mod scoped_guard;
pub mod spin_lock;
mod stall;
pub mod ticket;
pub mod timeout;
pub mod wait_observer;

pub use acquisition::{EnterRequest, TryEnterRequest, WaitBudget};
pub use cancellation::{CancellationToken, global_token};
pub use owner::current_thread_token;
pub use scoped_guard::SpinLockGuard;
pub use spin_lock::TicketSpinLock;
pub use ticket::TicketSnapshot;
pub use timeout::{
    INFINITE_MILLIS, SpinTimeout, SpinTimeoutResolution, SpinTimeoutResolver, SpinTimeoutSource,
    parse_timeout_override,
};
pub use wait_observer::{LoggingSpinWaitObserver, NoopSpinWaitObserver, SpinWaitObserver};
