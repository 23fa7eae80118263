//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Property tests for the connection registry

use proptest::prelude::*;
use soapbridge_service::{Connection, ConnectionRegistry, ServerConfig, ServerId, SocketHandle};
use std::collections::HashSet;
use std::sync::Arc;

fn connection(index: usize, handle: u64) -> Arc<Connection> {
    let config = ServerConfig::builder(
        format!("srv{}", index),
        format!("#chan{}", index),
        "localhost",
    )
    .build()
    .unwrap();
    Arc::new(Connection::new(Arc::new(config), SocketHandle::new(handle)))
}

proptest! {
    #[test]
    fn replacement_keeps_one_handle_per_server(
        count in 1usize..6,
        replacements in prop::collection::vec(0usize..6, 0..40),
    ) {
        let registry = ConnectionRegistry::new();
        let mut next_handle = 1u64;
        for index in 0..count {
            registry.add(connection(index, next_handle)).unwrap();
            next_handle += 1;
        }

        let mut retired = Vec::new();
        for index in replacements.into_iter().filter(|index| *index < count) {
            let old = registry
                .find_by_id(&ServerId::new(format!("srv{}", index)))
                .unwrap();
            let fresh = Arc::new(Connection::new(
                old.shared_config(),
                SocketHandle::new(next_handle),
            ));
            next_handle += 1;
            let swapped = registry.replace(old.id(), fresh).unwrap();
            prop_assert_eq!(swapped.handle(), old.handle());
            retired.push(swapped.handle());
        }

        let all = registry.all();
        prop_assert_eq!(all.len(), count);

        let handles: HashSet<SocketHandle> = all.iter().map(|c| c.handle()).collect();
        prop_assert_eq!(handles.len(), count);
        for connection in &all {
            let found = registry.find_by_handle(connection.handle()).unwrap();
            prop_assert!(Arc::ptr_eq(&found, connection));
            let found = registry.find_by_channel(connection.channel()).unwrap();
            prop_assert!(Arc::ptr_eq(&found, connection));
        }
        for handle in retired {
            prop_assert!(registry.find_by_handle(handle).is_none());
        }
    }

    #[test]
    fn insertion_order_survives_replacement(count in 1usize..8, victim in 0usize..8) {
        let registry = ConnectionRegistry::new();
        for index in 0..count {
            registry.add(connection(index, index as u64 + 1)).unwrap();
        }
        let victim = victim % count;
        let old = registry.all()[victim].clone();
        let fresh = Arc::new(Connection::new(old.shared_config(), SocketHandle::new(100)));
        registry.replace(old.id(), fresh).unwrap();

        let ids: Vec<String> = registry.all().iter().map(|c| c.id().to_string()).collect();
        let expected: Vec<String> = (0..count).map(|index| format!("srv{}", index)).collect();
        prop_assert_eq!(ids, expected);
    }
}
