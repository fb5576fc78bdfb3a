// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Digests and encodings used by the signers.

use crate::Error;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use hmac::Hmac;
use hmac::Mac;
use sha2::Digest;
use sha2::Sha256;

fn mac(key: &[u8], content: &[u8]) -> Hmac<Sha256> {
    // HMAC accepts keys of any length.
    let mut h = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key length");
    h.update(content);
    h
}

/// Standard base64 with padding.
pub fn base64_encode(content: &[u8]) -> String {
    BASE64_STANDARD.encode(content)
}

/// Decode standard base64, as used by Azure account keys.
pub fn base64_decode(content: &str) -> crate::Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(content)
        .map_err(|e| Error::request_invalid("base64 decode failed").with_source(e))
}

/// Lowercase hex of the SHA256 digest, the SigV4 payload hash.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content).as_slice())
}

/// Raw HMAC-SHA256, used to derive SigV4 signing keys.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> Vec<u8> {
    mac(key, content).finalize().into_bytes().to_vec()
}

/// Base64 of HMAC-SHA256, the Azure Shared Key signature.
pub fn base64_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    base64_encode(&mac(key, content).finalize().into_bytes())
}

/// Lowercase hex of HMAC-SHA256, the SigV4 signature.
pub fn hex_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    hex::encode(mac(key, content).finalize().into_bytes())
}
