/// VulkanBackend - Vulkan implementation of the Backend trait
///
/// Owns the instance and enumerates physical devices as adapters.

use frame_harness::harness::{Config, Error, Result};
use frame_harness::harness::device::{
    AdapterInfo, Backend, FeatureLevel, GpuPreference, GraphicsDevice,
};
use frame_harness::{harness_debug, harness_err, harness_error, harness_info};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::RawDisplayHandle;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, InstanceContext};
use crate::vulkan_device::VulkanGraphicsDevice;
use crate::vulkan_format::{adapter_kind, api_version_to_feature_level, order_by_preference};

/// Minimum capability level: Vulkan 1.3 (timeline semaphores and dynamic rendering are core)
pub const MIN_FEATURE_LEVEL: FeatureLevel = FeatureLevel::new(1, 3);

/// Vulkan backend (instance + adapter enumeration)
pub struct VulkanBackend {
    instance: Arc<InstanceContext>,
}

impl VulkanBackend {
    /// Create the Vulkan instance for windows on `display`
    ///
    /// Validation layers are requested when `config.enable_validation` is set
    /// and the crate is built with the `vulkan-validation` feature.
    pub fn new(config: &Config, display: RawDisplayHandle) -> Result<Self> {
        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load().map_err(|e| {
                harness_err!("harness::vulkan", "Failed to load Vulkan library: {:?}", e)
            })?;

            let app_name = CString::new(config.app_name.as_str())
                .unwrap_or_else(|_| CString::from(c"Frame Harness"));

            // Application Info
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Frame Harness")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Get required extensions
            #[allow(unused_mut)]
            let mut extension_names = ash_window::enumerate_required_extensions(display)
                .map_err(|e| {
                    harness_err!("harness::vulkan", "Failed to get required extensions: {:?}", e)
                })?
                .to_vec();

            #[allow(unused_mut)]
            let mut layer_names: Vec<*const std::os::raw::c_char> = Vec::new();

            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                harness_err!("harness::vulkan", "Failed to create Vulkan instance: {:?}", e)
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Setup debug messenger if validation is enabled
            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config();

                match debug_utils
                    .create_debug_utils_messenger(&crate::debug::messenger_create_info(), None)
                {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        crate::debug::cleanup_debug_config();
                        instance.destroy_instance(None);
                        return Err(harness_err!(
                            "harness::vulkan",
                            "Failed to create debug messenger: {:?}",
                            e
                        ));
                    }
                }
            } else {
                (None, None)
            };

            #[cfg(not(feature = "vulkan-validation"))]
            if config.enable_validation {
                harness_debug!(
                    "harness::vulkan",
                    "validation requested but the vulkan-validation feature is disabled"
                );
            }

            Ok(Self {
                instance: Arc::new(InstanceContext {
                    entry,
                    instance,
                    surface_loader,
                    #[cfg(feature = "vulkan-validation")]
                    debug_utils_loader,
                    #[cfg(feature = "vulkan-validation")]
                    debug_messenger,
                }),
            })
        }
    }

    /// Physical devices in driver order
    fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        unsafe {
            self.instance
                .instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    harness_err!("harness::vulkan", "Failed to enumerate physical devices: {:?}", e)
                })
        }
    }

    fn physical_device(&self, adapter: &AdapterInfo) -> Result<vk::PhysicalDevice> {
        self.physical_devices()?
            .get(adapter.index)
            .copied()
            .ok_or_else(|| {
                harness_err!("harness::vulkan", "Adapter {} ({}) disappeared", adapter.index, adapter.name)
            })
    }

    fn adapter_info(&self, index: usize, physical_device: vk::PhysicalDevice) -> AdapterInfo {
        let instance = &self.instance.instance;
        unsafe {
            let properties = instance.get_physical_device_properties(physical_device);
            let name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| format!("Vulkan device {}", index));

            let memory = instance.get_physical_device_memory_properties(physical_device);
            let dedicated_video_memory = memory.memory_heaps[..memory.memory_heap_count as usize]
                .iter()
                .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
                .map(|heap| heap.size)
                .sum();

            AdapterInfo {
                index,
                name,
                kind: adapter_kind(properties.device_type),
                vendor_id: properties.vendor_id,
                device_id: properties.device_id,
                feature_level: api_version_to_feature_level(properties.api_version),
                dedicated_video_memory,
            }
        }
    }

    /// First queue family with graphics support
    fn graphics_queue_family(&self, physical_device: vk::PhysicalDevice) -> Option<u32> {
        unsafe {
            self.instance
                .instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|index| index as u32)
        }
    }

    fn supports_swapchain(&self, physical_device: vk::PhysicalDevice) -> bool {
        unsafe {
            self.instance
                .instance
                .enumerate_device_extension_properties(physical_device)
                .map(|extensions| {
                    extensions.iter().any(|ext| {
                        ext.extension_name_as_c_str()
                            .map(|name| name == ash::khr::swapchain::NAME)
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false)
        }
    }

    /// Timeline semaphores (fence) and dynamic rendering (clears)
    fn supports_required_features(&self, physical_device: vk::PhysicalDevice) -> bool {
        let mut features12 = vk::PhysicalDeviceVulkan12Features::default();
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .push_next(&mut features12)
            .push_next(&mut features13);
        unsafe {
            self.instance
                .instance
                .get_physical_device_features2(physical_device, &mut features2);
        }
        let timeline = features12.timeline_semaphore == vk::TRUE;
        let dynamic_rendering = features13.dynamic_rendering == vk::TRUE;
        timeline && dynamic_rendering
    }
}

impl Backend for VulkanBackend {
    fn name(&self) -> &str {
        "vulkan"
    }

    fn minimum_feature_level(&self) -> FeatureLevel {
        MIN_FEATURE_LEVEL
    }

    fn enumerate_adapters(&self, preference: GpuPreference) -> Result<Vec<AdapterInfo>> {
        let mut adapters: Vec<AdapterInfo> = self
            .physical_devices()?
            .into_iter()
            .enumerate()
            .map(|(index, physical_device)| self.adapter_info(index, physical_device))
            .collect();
        order_by_preference(&mut adapters, preference, |adapter| adapter.kind);
        Ok(adapters)
    }

    fn probe_adapter(&self, adapter: &AdapterInfo, min_level: FeatureLevel) -> bool {
        if adapter.feature_level < min_level {
            return false;
        }
        let physical_device = match self.physical_device(adapter) {
            Ok(physical_device) => physical_device,
            Err(_) => return false,
        };
        let capable = self.graphics_queue_family(physical_device).is_some()
            && self.supports_swapchain(physical_device)
            && self.supports_required_features(physical_device);
        if !capable {
            harness_debug!(
                "harness::vulkan",
                "adapter {} ({}) lacks a graphics queue, VK_KHR_swapchain or required features",
                adapter.index, adapter.name
            );
        }
        capable
    }

    fn create_device(
        &mut self,
        adapter: &AdapterInfo,
        min_level: FeatureLevel,
    ) -> Result<Box<dyn GraphicsDevice>> {
        if adapter.feature_level < min_level {
            return Err(Error::DeviceCreationFailed(format!(
                "{} supports Vulkan {} (minimum {})",
                adapter.name, adapter.feature_level, min_level
            )));
        }

        let physical_device = self.physical_device(adapter)?;
        let instance = &self.instance.instance;

        let graphics_family_index = self.graphics_queue_family(physical_device).ok_or_else(|| {
            harness_error!("harness::vulkan", "No graphics queue family on {}", adapter.name);
            Error::QueueCreationFailed(format!("no graphics queue family on {}", adapter.name))
        })?;

        unsafe {
            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let mut features12 = vk::PhysicalDeviceVulkan12Features::default()
                .timeline_semaphore(true);
            let mut features13 = vk::PhysicalDeviceVulkan13Features::default()
                .dynamic_rendering(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut features12)
                .push_next(&mut features13);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to create logical device: {:?}", e);
                    Error::DeviceCreationFailed(format!("vkCreateDevice failed: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);

            // Create GPU allocator
            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    harness_error!("harness::vulkan", "Failed to create GPU allocator: {:?}", e);
                    return Err(Error::DeviceCreationFailed(format!(
                        "Failed to create allocator: {:?}",
                        e
                    )));
                }
            };

            harness_info!(
                "harness::vulkan",
                "Vulkan device created on {} (queue family {})",
                adapter.name, graphics_family_index
            );

            let ctx = Arc::new(GpuContext::new(
                Arc::clone(&self.instance),
                physical_device,
                device,
                allocator,
                graphics_queue,
                graphics_family_index,
            ));

            Ok(Box::new(VulkanGraphicsDevice::new(ctx, adapter.clone())))
        }
    }
}
