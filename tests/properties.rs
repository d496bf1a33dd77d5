//! Property tests for clock offsets and identity assignment

use proptest::prelude::*;

use botfleet::coordinator::clock::{align, estimate, RegistrationSample};
use botfleet::coordinator::DeviceRegistry;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

proptest! {
    #[test]
    fn estimate_is_exact_difference(
        device in -1_000_000_000_000_000i64..1_000_000_000_000_000,
        now in -1_000_000_000_000_000i64..1_000_000_000_000_000,
    ) {
        prop_assert_eq!(estimate(device, now), now - device);
        prop_assert_eq!(align(device, estimate(device, now)), now);
        prop_assert_eq!(RegistrationSample::new(device, now).offset(), now - device);
    }

    #[test]
    fn kth_distinct_address_gets_id_k(addresses in prop::collection::vec("[a-z]{1,3}", 1..40)) {
        let registry = DeviceRegistry::new();
        let mut expected: Vec<String> = Vec::new();

        runtime().block_on(async {
            for (i, address) in addresses.iter().enumerate() {
                let id = registry.register(address, i as i64, 1_000).await.unwrap();
                let position = match expected.iter().position(|a| a == address) {
                    Some(p) => p,
                    None => {
                        expected.push(address.clone());
                        expected.len() - 1
                    }
                };
                assert_eq!(id, position as u64);
            }

            let devices = registry.devices().await;
            assert_eq!(devices.len(), expected.len());
            for (device, address) in devices.iter().zip(&expected) {
                assert_eq!(&device.address, address);
                // Offset comes from the first registration of that address
                let first = addresses.iter().position(|a| a == address).unwrap() as i64;
                assert_eq!(device.clock_offset_ms, 1_000 - first);
            }
        });
    }
}
