// Domain layer: conversion models and ports. Adapters and the core engine depend on these, never the reverse.

pub mod model;
pub mod ports;
