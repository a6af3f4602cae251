// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use culler::store::{ClassificationRecord, StoreRow};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let record = ClassificationRecord::decode(text);
    // A label without '_' survives a round trip
    if !record.classification.contains('_') {
        let again = ClassificationRecord::decode(&record.encode());
        assert_eq!(again.classification, record.classification);
    }

    if let Ok(row) = serde_json::from_str::<StoreRow>(text) {
        let _ = row.record();
    }
});
